//! Entry point tying registry, dispatcher, deadline and collector together.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregation::collector::collect;
use crate::aggregation::deadline::DeadlineGovernor;
use crate::aggregation::dispatcher::dispatch;
use crate::aggregation::registry::CallRegistry;
use crate::aggregation::result::AggregateResult;
use crate::config::AggregationConfig;
use crate::observability::metrics;

/// Fan-out/fan-in aggregator with a fixed overall budget.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    budget: Duration,
}

impl Aggregator {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn from_config(config: &AggregationConfig) -> Self {
        Self::new(Duration::from_millis(config.budget_ms))
    }

    /// Same aggregator with a different budget.
    pub fn with_budget(self, budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Aggregate `registry` for `subject` within the budget.
    pub async fn aggregate(&self, subject: &str, registry: CallRegistry) -> AggregateResult {
        self.aggregate_until(subject, registry, CancellationToken::new())
            .await
    }

    /// Like [`aggregate`](Self::aggregate), but also gives up when `upstream` is cancelled.
    ///
    /// Always returns a complete result: one entry per registered service,
    /// either in `results` or in `errors`.
    #[tracing::instrument(
        name = "aggregate",
        skip(self, registry, upstream),
        fields(services = registry.len(), budget_ms = self.budget.as_millis() as u64)
    )]
    pub async fn aggregate_until(
        &self,
        subject: &str,
        registry: CallRegistry,
        upstream: CancellationToken,
    ) -> AggregateResult {
        let started = Instant::now();
        let expected = registry.names();

        let governor = DeadlineGovernor::arm(self.budget, upstream);
        let signal = governor.signal();

        let (intake_tx, intake_rx) = mpsc::channel(expected.len().max(1));
        dispatch(subject, registry, &signal, intake_tx);

        let result = collect(intake_rx, &expected, &signal, started).await;
        drop(governor);

        tracing::info!(
            status = result.status.as_str(),
            results = result.results.len(),
            errors = result.errors.len(),
            timed_out = result.timed_out,
            duration_ms = result.elapsed.as_millis() as u64,
            "Aggregation finished"
        );
        metrics::record_aggregation(result.status.as_str(), result.timed_out, result.elapsed);

        result
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::from_config(&AggregationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::outcome::{FailureKind, FetchError, FireCause, FailureReason};
    use crate::aggregation::registry::fetcher_fn;
    use crate::aggregation::result::AggregateStatus;
    use serde_json::json;

    fn delayed(ms: u64, payload: serde_json::Value) -> impl crate::aggregation::FetchOperation {
        fetcher_fn(move |_| {
            let payload = payload.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(payload)
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_service_times_out() {
        let registry = CallRegistry::new()
            .with("user", delayed(50, json!({ "name": "John Doe" })))
            .and_then(|r| r.with("orders", delayed(50, json!([]))))
            .and_then(|r| r.with("notifications", delayed(2000, json!({ "unread": 3 }))))
            .unwrap();

        let aggregator = Aggregator::new(Duration::from_millis(1000));
        let result = aggregator.aggregate("123", registry).await;

        assert_eq!(result.results.len(), 2);
        assert!(result.results.contains_key("user"));
        assert!(result.results.contains_key("orders"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].service.as_str(), "notifications");
        assert_eq!(result.errors[0].kind, FailureKind::Timeout);
        assert!(result.timed_out);
        assert_eq!(result.status, AggregateStatus::Partial);
        assert!(result.elapsed >= Duration::from_millis(1000));
        assert!(result.elapsed < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_fast_no_timeout() {
        let registry = CallRegistry::new()
            .with("a", delayed(10, json!(1)))
            .and_then(|r| r.with("b", delayed(20, json!(2))))
            .unwrap();

        let result = Aggregator::new(Duration::from_secs(1)).aggregate("x", registry).await;
        assert_eq!(result.results.len(), 2);
        assert!(result.errors.is_empty());
        assert!(!result.timed_out);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let result = Aggregator::default().aggregate("123", CallRegistry::new()).await;
        assert!(result.results.is_empty());
        assert!(result.errors.is_empty());
        assert!(!result.timed_out);
        assert!(result.elapsed < Duration::from_millis(50));
        assert_eq!(result.status, AggregateStatus::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_cancel_stops_waiting() {
        let registry = CallRegistry::new()
            .with("slow", delayed(10_000, json!(null)))
            .unwrap();
        let upstream = CancellationToken::new();

        let canceller = upstream.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = Aggregator::new(Duration::from_secs(5))
            .aggregate_until("1", registry, upstream)
            .await;

        assert!(result.timed_out);
        assert_eq!(
            result.errors[0].reason,
            FailureReason::Timeout(FireCause::Cancelled)
        );
        assert!(result.elapsed < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_aggregation_releases_race_tasks() {
        let registry = CallRegistry::new()
            .with("slow", delayed(300, json!(null)))
            .unwrap();
        let metrics = tokio::runtime::Handle::current().metrics();

        let aggregation = tokio::spawn(async move {
            Aggregator::new(Duration::from_secs(10))
                .aggregate("1", registry)
                .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        aggregation.abort();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Only the in-flight fetch is left running.
        assert_eq!(metrics.num_alive_tasks(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(metrics.num_alive_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_budget() {
        let registry = CallRegistry::new()
            .with("a", delayed(10, json!(1)))
            .unwrap();

        let result = Aggregator::new(Duration::MAX).aggregate("1", registry).await;
        assert!(result.success);
        assert!(!result.timed_out);

        let empty = Aggregator::default()
            .with_budget(Duration::MAX)
            .aggregate("1", CallRegistry::new())
            .await;
        assert_eq!(empty.status, AggregateStatus::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_downstream_failure_is_not_timeout() {
        let registry = CallRegistry::new()
            .with("ok", delayed(5, json!("fine")))
            .and_then(|r| {
                r.with(
                    "bad",
                    fetcher_fn(|_| async { Err(FetchError::Transport("connection refused".into())) }),
                )
            })
            .unwrap();

        let result = Aggregator::new(Duration::from_secs(1)).aggregate("1", registry).await;
        assert!(!result.timed_out);
        assert_eq!(result.errors[0].kind, FailureKind::Downstream);
        assert_eq!(result.results["ok"], json!("fine"));
    }
}
