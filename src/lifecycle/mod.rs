//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight aggregations finish → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup in main: config, logging, metrics, listener, server
//! - In-flight aggregations are bounded by their budget, so draining is short

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
