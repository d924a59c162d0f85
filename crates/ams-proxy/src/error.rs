//! API error types and responses.
//!
//! The body shape depends on the route family, matching what existing clients
//! already parse.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing authorization header on an authenticated route.
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upstream answered with an error; status and body are passed through.
    #[error("upstream returned {status}")]
    Upstream { status: StatusCode, body: Value },

    /// Upstream could not be reached.
    #[error("upstream unavailable: {0}")]
    BadGateway(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Transfer failed (`{status: "error", message, error, details}`).
    #[error("{message}: {details}")]
    TransferFailed {
        message: &'static str,
        code: &'static str,
        details: String,
    },

    /// File route failure (`{detail}`).
    #[error("{detail}")]
    Detail { status: StatusCode, detail: String },

    /// Auth route failure (`{error}`).
    #[error("{message}")]
    Auth { status: StatusCode, message: String },
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) | Self::TransferFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Detail { status, .. } | Self::Auth { status, .. } => *status,
        }
    }

    /// Map a failed upstream call that never produced a response.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        tracing::warn!(error = %err, "Upstream request failed");
        if err.is_connect() || err.is_timeout() {
            Self::BadGateway("Agent service is unreachable".to_string())
        } else {
            Self::Internal("Internal server error".to_string())
        }
    }

    /// Pass an upstream error response through, with a fallback body when it
    /// is not JSON.
    pub async fn from_upstream(response: reqwest::Response, fallback: Value) -> Self {
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(fallback);
        tracing::debug!(status = status.as_u16(), "Passing upstream error through");
        Self::Upstream { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Unauthorized(message)
            | Self::BadRequest(message)
            | Self::BadGateway(message)
            | Self::Internal(message) => json!({
                "status": status.as_u16(),
                "message": message,
                "data": null,
            }),
            Self::Upstream { body, .. } => body,
            Self::TransferFailed {
                message,
                code,
                details,
            } => json!({
                "status": "error",
                "message": message,
                "error": code,
                "details": details,
            }),
            Self::Detail { detail, .. } => json!({ "detail": detail }),
            Self::Auth { message, .. } => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
