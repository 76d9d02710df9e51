//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Translate query parameters into an aggregation call
//! - Cancel the aggregation when the client goes away
//! - Apply configuration reloads without dropping traffic

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::aggregation::{Aggregator, CallRegistry};
use crate::config::GatewayConfig;
use crate::http::request::{is_valid_subject, make_span, request_id_header};
use crate::http::response::{AggregateResponse, ErrorResponse};
use crate::services::{registry_from_config, ServiceSetupError};

/// Everything a request needs, swapped as a unit on reload.
#[derive(Debug)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub registry: CallRegistry,
    pub aggregator: Aggregator,
}

impl GatewayState {
    /// Build state with HTTP fetchers for the configured services.
    pub fn from_config(config: GatewayConfig) -> Result<Self, ServiceSetupError> {
        let registry = registry_from_config(&config.services, &config.downstream)?;
        Ok(Self::with_registry(config, registry))
    }

    /// Build state around an externally assembled registry.
    pub fn with_registry(config: GatewayConfig, registry: CallRegistry) -> Self {
        Self {
            aggregator: Aggregator::from_config(&config.aggregation),
            config,
            registry,
        }
    }
}

// Time left after the aggregation budget to encode and send the response.
const RESPONSE_HEADROOM: Duration = Duration::from_millis(250);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<GatewayState>>,
    /// Fixed when the router is built; reloads cannot change it.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(state: GatewayState) -> Self {
        Self {
            request_timeout: Duration::from_secs(state.config.listener.request_timeout_secs),
            inner: Arc::new(ArcSwap::from_pointee(state)),
        }
    }

    /// Largest budget an aggregation may use so that it still answers
    /// before the request timeout cuts the connection.
    pub fn budget_ceiling(&self, config: &GatewayConfig) -> Duration {
        Duration::from_millis(config.aggregation.max_budget_ms)
            .min(self.request_timeout.saturating_sub(RESPONSE_HEADROOM))
            .max(Duration::from_millis(1))
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server whose registry comes from the configured services.
    pub fn new(config: GatewayConfig) -> Result<Self, ServiceSetupError> {
        Ok(Self::from_state(GatewayState::from_config(config)?))
    }

    /// Create a server around a caller-supplied registry.
    pub fn with_registry(config: GatewayConfig, registry: CallRegistry) -> Self {
        Self::from_state(GatewayState::with_registry(config, registry))
    }

    fn from_state(state: GatewayState) -> Self {
        let state = AppState::new(state);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let header = request_id_header();
        let request_timeout = state.request_timeout;
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/aggregate", get(aggregate_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(header.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(PropagateRequestIdLayer::new(header))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        request_timeout,
                    )),
            )
    }

    /// Shared state, e.g. for inspecting the active configuration.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Consume the server and return the bare router.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires, applying `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(apply_config_updates(
            self.state.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn apply_config_updates(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                let bind_changed =
                    config.listener.bind_address != state.inner.load().config.listener.bind_address;
                if bind_changed {
                    tracing::warn!(
                        bind_address = %config.listener.bind_address,
                        "Listener address changes need a restart; ignoring that field"
                    );
                }
                if Duration::from_secs(config.listener.request_timeout_secs) != state.request_timeout {
                    tracing::warn!(
                        request_timeout_secs = config.listener.request_timeout_secs,
                        "Request timeout changes need a restart; ignoring that field"
                    );
                }
                match GatewayState::from_config(config) {
                    Ok(next) => {
                        tracing::info!(
                            services = next.registry.len(),
                            budget_ms = next.config.aggregation.budget_ms,
                            "Configuration reloaded"
                        );
                        state.inner.store(Arc::new(next));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected configuration update");
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Query string of `/api/aggregate`.
#[derive(Debug, Default, Deserialize)]
pub struct AggregateParams {
    pub user_id: Option<String>,
    pub budget_ms: Option<u64>,
}

/// Aggregate every registered service for one subject.
///
/// Always answers 200 with whatever succeeded; partial failure is
/// reported in the body, not the status.
async fn aggregate_handler(
    State(state): State<AppState>,
    Query(params): Query<AggregateParams>,
) -> Response {
    let inner = state.inner.load_full();
    let aggregation = &inner.config.aggregation;

    let subject = params
        .user_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| aggregation.default_subject.clone());
    if !is_valid_subject(&subject) {
        return ErrorResponse::new(StatusCode::BAD_REQUEST, "invalid user_id").into_response();
    }

    let budget = params
        .budget_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| inner.aggregator.budget())
        .clamp(Duration::from_millis(1), state.budget_ceiling(&inner.config));
    let aggregator = inner.aggregator.with_budget(budget);

    // Dropped together with this future when the client disconnects.
    let upstream = CancellationToken::new();
    let _disconnect_guard = upstream.clone().drop_guard();

    let result = aggregator
        .aggregate_until(&subject, inner.registry.clone(), upstream)
        .await;
    AggregateResponse(result).into_response()
}
