//! Per-service outcomes and failure taxonomy.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::aggregation::registry::ServiceName;

/// Opaque structured value returned by a fetcher.
pub type Payload = serde_json::Value;

/// Result of a single fetch operation.
pub type FetchResult = Result<Payload, FetchError>;

/// Errors a fetch operation can report on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Transport(String),

    /// Downstream answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// Response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The fetch task ended without reporting (panic or runtime shutdown).
    #[error("fetch aborted: {0}")]
    Aborted(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Why a deadline signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FireCause {
    /// The configured budget elapsed.
    BudgetElapsed,
    /// The originating request was abandoned.
    Cancelled,
}

impl fmt::Display for FireCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireCause::BudgetElapsed => f.write_str("deadline exceeded"),
            FireCause::Cancelled => f.write_str("request cancelled"),
        }
    }
}

/// Coarse failure category, used for metrics and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Downstream,
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Downstream => "downstream",
            FailureKind::Timeout => "timeout",
        }
    }
}

/// Reason recorded for a failed service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error(transparent)]
    Downstream(FetchError),

    #[error("service timeout: {0}")]
    Timeout(FireCause),
}

impl FailureReason {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureReason::Downstream(_) => FailureKind::Downstream,
            FailureReason::Timeout(_) => FailureKind::Timeout,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureReason::Timeout(_))
    }
}

impl From<FetchError> for FailureReason {
    fn from(err: FetchError) -> Self {
        FailureReason::Downstream(err)
    }
}

/// Exactly one of these is produced per registry entry per aggregation.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub service: ServiceName,
    pub result: Result<Payload, FailureReason>,
}

impl Outcome {
    pub fn success(service: ServiceName, payload: Payload) -> Self {
        Self {
            service,
            result: Ok(payload),
        }
    }

    pub fn failure(service: ServiceName, reason: impl Into<FailureReason>) -> Self {
        Self {
            service,
            result: Err(reason.into()),
        }
    }

    pub fn timeout(service: ServiceName, cause: FireCause) -> Self {
        Self::failure(service, FailureReason::Timeout(cause))
    }
}
