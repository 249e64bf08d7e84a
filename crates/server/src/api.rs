//! HTTP endpoint modules.
//!
//! Shared error shape and helpers live here.

pub mod doc;
pub(crate) mod health;
pub(crate) mod outputs;
pub(crate) mod trigger;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

// ── Helpers ─────────────────────────────────────────────────────

pub(crate) fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub(crate) fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

// ── Re-exports ───────────────────────────────────────────────────

pub use health::health;
pub use outputs::{history, operators};
pub use trigger::force_check;
