//! Response mapping.
//!
//! # Design Decisions
//! - An aggregation always answers 200; partial failure lives in the body
//! - `x-aggregate-status` mirrors the body status for log scraping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::aggregation::AggregateResult;

pub const X_AGGREGATE_STATUS: &str = "x-aggregate-status";

/// JSON body of `/api/aggregate`.
#[derive(Debug)]
pub struct AggregateResponse(pub AggregateResult);

impl IntoResponse for AggregateResponse {
    fn into_response(self) -> Response {
        let status = self.0.status.as_str();
        (StatusCode::OK, [(X_AGGREGATE_STATUS, status)], Json(self.0)).into_response()
    }
}

/// Plain `{"error": ...}` body for requests rejected before aggregation.
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    message: &'static str,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
