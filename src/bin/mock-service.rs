//! Mock downstream services for local runs of the gateway.
//!
//! Each endpoint sleeps for a random delay before answering, so the
//! gateway sees realistic, uneven latencies.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{extract::Path, routing::get, Json, Router};
use clap::Parser;
use rand::Rng;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "mock-service")]
#[command(about = "Mock user/orders/notifications/inventory services", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    bind: SocketAddr,
}

async fn random_delay(max_ms: u64) {
    let ms = rand::thread_rng().gen_range(0..max_ms);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

async fn user(Path(id): Path<String>) -> Json<Value> {
    random_delay(100).await;
    Json(json!({
        "service": "user",
        "id": id,
        "name": "John Doe",
        "email": "john@example.com",
        "timestamp": now(),
    }))
}

async fn orders(Path(user_id): Path<String>) -> Json<Value> {
    random_delay(150).await;
    Json(json!({
        "service": "orders",
        "userId": user_id,
        "orders": [
            { "id": "ORD001", "total": 99.99 },
            { "id": "ORD002", "total": 149.99 },
        ],
        "timestamp": now(),
    }))
}

async fn notifications(Path(user_id): Path<String>) -> Json<Value> {
    random_delay(200).await;
    Json(json!({
        "service": "notifications",
        "userId": user_id,
        "unread": 3,
        "messages": ["Welcome back!", "Order shipped", "New feature available"],
        "timestamp": now(),
    }))
}

async fn inventory(Path(product_id): Path<String>) -> Json<Value> {
    random_delay(80).await;
    let stock = rand::thread_rng().gen_range(0..100);
    Json(json!({
        "service": "inventory",
        "productId": product_id,
        "stock": stock,
        "price": 49.99,
        "timestamp": now(),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let app = Router::new()
        .route("/mock/user/{id}", get(user))
        .route("/mock/orders/{user_id}", get(orders))
        .route("/mock/notifications/{user_id}", get(notifications))
        .route("/mock/inventory/{product_id}", get(inventory));

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    tracing::info!(address = %cli.bind, "Mock services listening");
    axum::serve(listener, app).await?;
    Ok(())
}
