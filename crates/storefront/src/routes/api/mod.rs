//! JSON API routes.

pub mod notifications;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error body for API endpoints: `{"ok": false, "error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    ok: bool,
    error: String,
    #[serde(skip)]
    status: StatusCode,
}

impl ApiError {
    /// An error response with `status` and a client-facing message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: msg.into(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
