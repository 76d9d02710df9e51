//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (budgets > 0, addresses parse)
//! - Keep every budget inside the listener's request timeout
//! - Check service names are unique and URLs usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("max_budget_ms ({max}) is below budget_ms ({budget})")]
    BudgetOrder { budget: u64, max: u64 },

    #[error("max_budget_ms ({max}) must be below the request timeout ({timeout_ms} ms)")]
    BudgetExceedsRequestTimeout { max: u64, timeout_ms: u64 },

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{name}' has an invalid url '{url}': {reason}")]
    ServiceUrl {
        name: String,
        url: String,
        reason: String,
    },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "listener.request_timeout_secs" });
    }

    let aggregation = &config.aggregation;
    if aggregation.budget_ms == 0 {
        errors.push(ValidationError::Zero { field: "aggregation.budget_ms" });
    }
    if aggregation.max_budget_ms < aggregation.budget_ms {
        errors.push(ValidationError::BudgetOrder {
            budget: aggregation.budget_ms,
            max: aggregation.max_budget_ms,
        });
    }
    let timeout_ms = config.listener.request_timeout_secs.saturating_mul(1000);
    if timeout_ms > 0 && aggregation.max_budget_ms >= timeout_ms {
        errors.push(ValidationError::BudgetExceedsRequestTimeout {
            max: aggregation.max_budget_ms,
            timeout_ms,
        });
    }

    if config.downstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "downstream.timeout_secs" });
    }

    let mut seen = HashSet::new();
    for service in &config.services {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        } else if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if let Err(reason) = check_url_template(&service.url) {
            errors.push(ValidationError::ServiceUrl {
                name: service.name.clone(),
                url: service.url.clone(),
                reason,
            });
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url_template(template: &str) -> Result<(), String> {
    let url = Url::parse(&template.replace("{id}", "probe")).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
