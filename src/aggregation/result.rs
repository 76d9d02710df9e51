//! Final aggregate handed back to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::aggregation::outcome::{FailureKind, FailureReason, Payload};
use crate::aggregation::registry::ServiceName;

/// Overall status derived from the merged outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    /// No errors (including the empty registry).
    Complete,
    /// Some results, some errors.
    Partial,
    /// Errors only.
    Failed,
}

impl AggregateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateStatus::Complete => "complete",
            AggregateStatus::Partial => "partial",
            AggregateStatus::Failed => "failed",
        }
    }
}

/// A failed service and why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFailure {
    pub service: ServiceName,
    pub kind: FailureKind,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: FailureReason,
}

impl ServiceFailure {
    pub fn new(service: ServiceName, reason: FailureReason) -> Self {
        Self {
            service,
            kind: reason.kind(),
            reason,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

fn serialize_reason<S: Serializer>(reason: &FailureReason, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// Result of one aggregation call.
///
/// Serializes as `{data, errors, duration_ms, timed_out, success, status}`.
/// Neither key order in `data` nor the order of `errors` reflects the
/// registry order.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    #[serde(rename = "data")]
    pub results: BTreeMap<ServiceName, Payload>,
    pub errors: Vec<ServiceFailure>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub timed_out: bool,
    pub success: bool,
    pub status: AggregateStatus,
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(elapsed.as_millis().try_into().unwrap_or(u64::MAX))
}

impl AggregateResult {
    pub(crate) fn finalize(
        results: BTreeMap<ServiceName, Payload>,
        errors: Vec<ServiceFailure>,
        elapsed: Duration,
        timed_out: bool,
    ) -> Self {
        let status = match (results.is_empty(), errors.is_empty()) {
            (_, true) => AggregateStatus::Complete,
            (false, false) => AggregateStatus::Partial,
            (true, false) => AggregateStatus::Failed,
        };
        Self {
            success: errors.is_empty(),
            results,
            errors,
            elapsed,
            timed_out,
            status,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.status == AggregateStatus::Partial
    }

    pub fn failure_for(&self, service: &str) -> Option<&ServiceFailure> {
        self.errors.iter().find(|f| f.service.as_str() == service)
    }

    pub fn timeouts(&self) -> impl Iterator<Item = &ServiceFailure> {
        self.errors.iter().filter(|f| f.is_timeout())
    }
}
