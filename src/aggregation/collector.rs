//! Fan-in of outcomes into the final aggregate.

use std::collections::{BTreeMap, HashSet};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::aggregation::deadline::DeadlineSignal;
use crate::aggregation::outcome::{FetchError, FailureReason, Outcome};
use crate::aggregation::registry::ServiceName;
use crate::aggregation::result::{AggregateResult, ServiceFailure};
use crate::observability::metrics;

/// Receive one outcome per expected service, then finalize.
///
/// The loop is bounded by `expected.len()`. If the intake closes early,
/// every service that never reported is recorded as aborted so the
/// result still covers the whole registry.
pub async fn collect(
    mut intake: mpsc::Receiver<Outcome>,
    expected: &[ServiceName],
    signal: &DeadlineSignal,
    started: Instant,
) -> AggregateResult {
    let mut results = BTreeMap::new();
    let mut errors = Vec::new();
    let mut reported: HashSet<ServiceName> = HashSet::with_capacity(expected.len());

    while reported.len() < expected.len() {
        let Some(outcome) = intake.recv().await else {
            tracing::warn!(
                received = reported.len(),
                expected = expected.len(),
                "Outcome intake closed early"
            );
            break;
        };

        if !expected.contains(&outcome.service) || reported.contains(&outcome.service) {
            tracing::warn!(service = %outcome.service, "Ignoring unexpected outcome");
            continue;
        }
        reported.insert(outcome.service.clone());
        merge(&mut results, &mut errors, outcome);
    }

    for service in expected.iter().filter(|s| !reported.contains(*s)) {
        let reason = FetchError::Aborted("no outcome reported".to_string());
        merge(&mut results, &mut errors, Outcome::failure(service.clone(), reason));
    }

    // Timed out iff the signal fired before this point.
    let timed_out = signal.is_fired();
    AggregateResult::finalize(results, errors, started.elapsed(), timed_out)
}

fn merge(
    results: &mut BTreeMap<ServiceName, serde_json::Value>,
    errors: &mut Vec<ServiceFailure>,
    outcome: Outcome,
) {
    match outcome.result {
        Ok(payload) => {
            metrics::record_service_outcome(outcome.service.as_str(), "success");
            results.insert(outcome.service, payload);
        }
        Err(reason) => {
            metrics::record_service_outcome(outcome.service.as_str(), reason.kind().as_str());
            log_failure(&outcome.service, &reason);
            errors.push(ServiceFailure::new(outcome.service, reason));
        }
    }
}

fn log_failure(service: &ServiceName, reason: &FailureReason) {
    match reason {
        FailureReason::Timeout(cause) => {
            tracing::warn!(service = %service, cause = %cause, "Service timed out");
        }
        FailureReason::Downstream(err) => {
            tracing::warn!(service = %service, error = %err, "Service failed");
        }
    }
}
