//! Request handling helpers.
//!
//! # Responsibilities
//! - Name the request ID header and build per-request trace spans
//! - Validate the subject identifier before it reaches any fetcher
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Subjects are restricted to a URL-path-safe alphabet

use axum::{body::Body, http::HeaderName, http::Request};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

const MAX_SUBJECT_LEN: usize = 128;

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Span for one inbound request, tagged with its request ID.
pub fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Whether `subject` may be passed to downstream services.
pub fn is_valid_subject(subject: &str) -> bool {
    !subject.is_empty()
        && subject.len() <= MAX_SUBJECT_LEN
        && subject
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
