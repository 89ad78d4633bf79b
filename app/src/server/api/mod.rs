//! REST API handlers grouped by domain.

pub mod chat;
pub mod music;

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

pub(crate) type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Standard error response.
pub fn err_json(status: u16, message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({ "status": "error", "error": message })),
    )
}
