//! Downstream services.
//!
//! # Responsibilities
//! - Build the shared downstream HTTP client from configuration
//! - Turn configured services into fetch operations
//! - Assemble the call registry handed to the aggregator
//!
//! # Design Decisions
//! - The client is constructed explicitly and injected into each fetcher
//! - Timeouts and retries live here, not in the aggregation core

pub mod http;

use std::sync::Arc;

use thiserror::Error;

use crate::aggregation::{CallRegistry, RegistryError};
use crate::config::{DownstreamConfig, ServiceConfig};
use crate::resilience::RetryPolicy;

pub use http::{build_client, HttpFetcher};

/// Errors building the registry from configuration.
#[derive(Debug, Error)]
pub enum ServiceSetupError {
    #[error("failed to build downstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Build a registry with one [`HttpFetcher`] per configured service.
pub fn registry_from_config(
    services: &[ServiceConfig],
    downstream: &DownstreamConfig,
) -> Result<CallRegistry, ServiceSetupError> {
    let client = build_client(downstream)?;
    let retry = RetryPolicy::from_config(downstream);

    let mut registry = CallRegistry::new();
    for service in services {
        let fetcher = HttpFetcher::new(service.url.clone(), client.clone(), retry);
        registry.register(service.name.as_str(), Arc::new(fetcher))?;
    }

    tracing::debug!(services = ?registry, "Call registry built");
    Ok(registry)
}
