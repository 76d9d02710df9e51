//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID span, subject validation)
//!     → aggregation::Aggregator (fan-out / fan-in)
//!     → response.rs (AggregateResult → JSON, always 200)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::AggregateResponse;
pub use server::{AppState, GatewayState, HttpServer};
