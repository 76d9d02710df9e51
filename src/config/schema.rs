//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Aggregation budget and defaults.
    pub aggregation: AggregationConfig,

    /// Downstream client behaviour (timeouts, retries).
    pub downstream: DownstreamConfig,

    /// Downstream services aggregated on every request.
    pub services: Vec<ServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            aggregation: AggregationConfig::default(),
            downstream: DownstreamConfig::default(),
            services: default_services(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_services() -> Vec<ServiceConfig> {
    [
        ("user", "http://localhost:9090/mock/user/{id}"),
        ("orders", "http://localhost:9090/mock/orders/{id}"),
        ("notifications", "http://localhost:9090/mock/notifications/{id}"),
    ]
    .into_iter()
    .map(|(name, url)| ServiceConfig {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Hard ceiling on a whole HTTP request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Aggregation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Overall budget for one aggregation in milliseconds.
    pub budget_ms: u64,

    /// Upper bound for a per-request budget override in milliseconds.
    pub max_budget_ms: u64,

    /// Subject used when the request names none.
    pub default_subject: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            budget_ms: 1000,
            max_budget_ms: 5000,
            default_subject: "123".to_string(),
        }
    }
}

/// Downstream HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt.
    pub retry_count: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` for downstream calls.
    pub use_system_proxy: bool,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            connect_timeout_secs: 1,
            retry_count: 2,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            use_system_proxy: true,
        }
    }
}

/// A downstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name, used as the key in the aggregate.
    pub name: String,

    /// URL template; `{id}` is replaced with the subject.
    pub url: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9100".to_string(),
        }
    }
}
