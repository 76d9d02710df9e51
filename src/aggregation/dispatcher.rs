//! Fan-out of registry entries into racing tasks.
//!
//! # Data Flow
//! ```text
//! registry entry
//!     → fetch task (runs the operation, reports over a oneshot)
//!     → race task (oneshot vs deadline signal)
//!     → exactly one Outcome on the intake channel
//! ```
//!
//! # Design Decisions
//! - The fetch runs on its own task so the deadline never drops it mid-flight
//! - A late fetch finds its oneshot receiver gone and discards the result
//! - The intake channel has one slot per entry, so reporting never blocks

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::aggregation::deadline::DeadlineSignal;
use crate::aggregation::outcome::{FetchError, FetchResult, FireCause, Outcome};
use crate::aggregation::registry::{CallRegistry, FetchOperation, ServiceName};
use crate::observability::metrics;

/// Spawn one racing task per registry entry.
///
/// Every task sends exactly one [`Outcome`] on `intake`. The caller must
/// size the channel to at least `registry.len()`.
pub fn dispatch(
    subject: &str,
    registry: CallRegistry,
    signal: &DeadlineSignal,
    intake: mpsc::Sender<Outcome>,
) {
    let subject: Arc<str> = Arc::from(subject);

    for (name, operation) in registry.into_entries() {
        let report = spawn_fetch(name.clone(), operation, subject.clone());
        tokio::spawn(race(name, report, signal.clone(), intake.clone()));
    }
}

/// Start the operation on its own task and hand back the receiving end of its report.
fn spawn_fetch(
    service: ServiceName,
    operation: Arc<dyn FetchOperation>,
    subject: Arc<str>,
) -> oneshot::Receiver<FetchResult> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = operation.fetch(&subject).await;
        if tx.send(result).is_err() {
            tracing::debug!(service = %service, "Late result discarded");
            metrics::record_late_completion(service.as_str());
        }
    });

    rx
}

async fn race(
    service: ServiceName,
    report: oneshot::Receiver<FetchResult>,
    signal: DeadlineSignal,
    intake: mpsc::Sender<Outcome>,
) {
    let outcome = tokio::select! {
        // A result that is already available wins over a simultaneous deadline.
        biased;
        received = report => match received {
            Ok(Ok(payload)) => Outcome::success(service, payload),
            Ok(Err(err)) => Outcome::failure(service, err),
            Err(_) => Outcome::failure(
                service,
                FetchError::Aborted("fetch task ended without a result".to_string()),
            ),
        },
        _ = signal.fired() => {
            let cause = signal.cause().unwrap_or(FireCause::BudgetElapsed);
            tracing::debug!(service = %service, cause = %cause, "Abandoning fetch");
            Outcome::timeout(service, cause)
        }
    };

    // Only fails when the collector is gone; the outcome has nowhere to go.
    if let Err(err) = intake.send(outcome).await {
        tracing::debug!(service = %err.0.service, "Collector gone, outcome dropped");
    }
}
