//! Concurrent API gateway library.
//!
//! Fans one inbound request out to N downstream services, races every
//! call against a shared deadline and merges whatever arrived into a
//! best-effort composite response.

pub mod aggregation;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod services;

pub use aggregation::{AggregateResult, Aggregator, CallRegistry};
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
