//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Downstream fetch:
//!     → per-request client timeout (services::http)
//!     → On failure: retries.rs (check if retryable, retry with backoff)
//!     → backoff.rs (exponential delay + jitter)
//! ```
//!
//! # Design Decisions
//! - Retries belong to the fetcher, never to the aggregation core
//! - Jittered backoff prevents thundering herd
//! - The aggregation deadline still bounds every retry loop from outside

pub mod backoff;
pub mod retries;

pub use retries::{is_retryable, RetryPolicy};
