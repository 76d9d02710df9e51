//! End-to-end failure injection through the HTTP gateway.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use concurrent_api_gateway::aggregation::{fetcher_fn, CallRegistry};
use concurrent_api_gateway::config::GatewayConfig;
use concurrent_api_gateway::http::HttpServer;
use concurrent_api_gateway::lifecycle::Shutdown;

mod common;

/// Start the gateway on an ephemeral port; returns its address.
async fn start_gateway(
    config: GatewayConfig,
    shutdown: &Shutdown,
) -> (SocketAddr, mpsc::UnboundedSender<GatewayConfig>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    (addr, updates_tx)
}

async fn aggregate(addr: SocketAddr, query: &str) -> (u16, Value) {
    let res = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
        .get(format!("http://{}/api/aggregate{}", addr, query))
        .send()
        .await
        .expect("gateway unreachable");
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_all_backends_healthy() {
    let user = common::start_mock_backend(r#"{"name":"John Doe"}"#).await;
    let orders = common::start_mock_backend(r#"{"orders":[]}"#).await;

    let shutdown = Shutdown::new();
    let config = common::gateway_config(&[("user", user), ("orders", orders)]);
    let (addr, _updates) = start_gateway(config, &shutdown).await;

    let (status, body) = aggregate(addr, "?user_id=7").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["user"]["name"], "John Doe");
    assert_eq!(body["errors"].as_array().unwrap().len(), 0);
    assert_eq!(body["success"], true);
    assert_eq!(body["timed_out"], false);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_backend_times_out_but_others_return() {
    let user = common::start_mock_backend(r#"{"name":"John Doe"}"#).await;
    let slow = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "{}".to_string())
    })
    .await;

    let shutdown = Shutdown::new();
    let mut config = common::gateway_config(&[("user", user), ("notifications", slow)]);
    config.aggregation.budget_ms = 300;
    let (addr, _updates) = start_gateway(config, &shutdown).await;

    let started = Instant::now();
    let (status, body) = aggregate(addr, "").await;
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(status, 200);
    assert_eq!(body["timed_out"], true);
    assert_eq!(body["status"], "partial");
    assert!(body["data"]["user"].is_object());
    assert_eq!(body["errors"][0]["service"], "notifications");
    assert_eq!(body["errors"][0]["kind"], "timeout");

    shutdown.trigger();
}

#[tokio::test]
async fn test_failing_backend_retried_then_reported() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let flaky = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            (503, r#"{"error":"unavailable"}"#.to_string())
        }
    })
    .await;
    let user = common::start_mock_backend(r#"{"name":"John Doe"}"#).await;

    let shutdown = Shutdown::new();
    let mut config = common::gateway_config(&[("user", user), ("orders", flaky)]);
    config.downstream.retry_count = 2;
    config.downstream.base_delay_ms = 10;
    config.downstream.max_delay_ms = 20;
    let (addr, _updates) = start_gateway(config, &shutdown).await;

    let (status, body) = aggregate(addr, "").await;
    assert_eq!(status, 200);
    assert_eq!(body["errors"][0]["service"], "orders");
    assert_eq!(body["errors"][0]["kind"], "downstream");
    assert_eq!(body["errors"][0]["reason"], "unexpected status 503");
    assert_eq!(calls.load(Ordering::SeqCst), 3, "one attempt plus two retries");

    shutdown.trigger();
}

#[tokio::test]
async fn test_budget_override_is_clamped() {
    let slow = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "{}".to_string())
    })
    .await;

    let shutdown = Shutdown::new();
    let mut config = common::gateway_config(&[("slow", slow)]);
    config.aggregation.budget_ms = 100;
    config.aggregation.max_budget_ms = 400;
    let (addr, _updates) = start_gateway(config, &shutdown).await;

    let started = Instant::now();
    let (_, body) = aggregate(addr, "?budget_ms=60000").await;
    let wall = started.elapsed();

    assert_eq!(body["timed_out"], true);
    assert!(wall >= Duration::from_millis(400), "took {:?}", wall);
    assert!(wall < Duration::from_secs(3), "took {:?}", wall);

    shutdown.trigger();
}

#[tokio::test]
async fn test_config_reload_swaps_services() {
    let user = common::start_mock_backend(r#"{"name":"John Doe"}"#).await;
    let inventory = common::start_mock_backend(r#"{"stock":5}"#).await;

    let shutdown = Shutdown::new();
    let (addr, updates) =
        start_gateway(common::gateway_config(&[("user", user)]), &shutdown).await;

    let (_, before) = aggregate(addr, "").await;
    assert!(before["data"]["inventory"].is_null());

    updates
        .send(common::gateway_config(&[("user", user), ("inventory", inventory)]))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_, after) = aggregate(addr, "").await;
    assert_eq!(after["data"]["inventory"]["stock"], 5);

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests() {
    let user = common::start_mock_backend(r#"{"name":"John Doe"}"#).await;
    let orders = common::start_mock_backend(r#"{"orders":[]}"#).await;

    let shutdown = Shutdown::new();
    let config = common::gateway_config(&[("user", user), ("orders", orders)]);
    let (addr, _updates) = start_gateway(config, &shutdown).await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        tasks.push(tokio::spawn(async move {
            aggregate(addr, &format!("?user_id=u{}", i)).await
        }));
    }

    for task in tasks {
        let (status, body) = task.await.unwrap();
        assert_eq!(status, 200);
        assert_eq!(body["data"].as_object().unwrap().len(), 2);
    }

    shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_client_disconnect_abandons_aggregation() {
    let registry = CallRegistry::new()
        .with(
            "slow",
            fetcher_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(Value::Null)
            }),
        )
        .unwrap();
    let router = HttpServer::with_registry(common::gateway_config(&[]), registry).into_router();
    let metrics = tokio::runtime::Handle::current().metrics();

    let request = Request::builder()
        .uri("/api/aggregate?budget_ms=4000")
        .body(Body::empty())
        .unwrap();
    let in_flight = tokio::spawn(router.oneshot(request));

    tokio::time::sleep(Duration::from_millis(50)).await;
    // Same as hyper dropping the handler when the client hangs up.
    in_flight.abort();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The race task stopped waiting; only the fetch itself runs on.
    assert_eq!(metrics.num_alive_tasks(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(metrics.num_alive_tasks(), 0);
}
