//! Request aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! CallRegistry (name → FetchOperation)
//!     → dispatcher.rs (one racing task per entry)
//!     → each task races its fetch against deadline.rs
//!     → Outcome per entry on a bounded intake channel
//!     → collector.rs (merge into results / errors)
//!     → AggregateResult (owned by the caller)
//! ```
//!
//! # Design Decisions
//! - Exactly one Outcome per registry entry, timeouts included
//! - The deadline never kills a fetch; it only stops waiting for it
//! - Message passing is the only synchronization; no shared maps
//! - Downstream failures and timeouts never abort the aggregation

pub mod aggregator;
pub mod collector;
pub mod deadline;
pub mod dispatcher;
pub mod outcome;
pub mod registry;
pub mod result;

pub use aggregator::Aggregator;
pub use deadline::{DeadlineGovernor, DeadlineSignal};
pub use outcome::{FailureKind, FailureReason, FetchError, FetchResult, FireCause, Outcome, Payload};
pub use registry::{fetcher_fn, CallRegistry, FetchOperation, FnFetcher, RegistryError, ServiceName};
pub use result::{AggregateResult, AggregateStatus, ServiceFailure};
