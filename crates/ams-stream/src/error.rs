//! Error types for ams-stream

use thiserror::Error;

/// Result type alias using ams-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to an agent backend
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure, no response, or the body read was rejected mid-stream
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No token, HTTP 401, or a 401 embedded in an error body
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Non-success HTTP status before streaming began
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend sent an explicit `error` event
    #[error("Stream error: {0}")]
    Stream(String),

    /// Attachment rejected before any network call
    #[error("Invalid attachment: {0}")]
    Validation(String),

    /// Upload succeeded at the HTTP level but the response was unusable
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Local I/O failed (reading an attachment from disk)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The turn was cancelled by the caller
    #[error("Request aborted")]
    Aborted,
}

impl Error {
    /// Create a status error from a code and message
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Whether the caller should trigger re-authentication
    pub fn is_unauthenticated(&self) -> bool {
        match self {
            Error::Unauthenticated(_) => true,
            Error::Http(e) => e.status().is_some_and(|s| s.as_u16() == 401),
            _ => false,
        }
    }

    /// Whether this is a benign cancellation rather than a failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// Human-readable text for the error message shown in the conversation
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated(message) => message.clone(),
            Error::Status { status, message } => friendly_status_message(*status, message),
            Error::Stream(message) | Error::Validation(message) => message.clone(),
            Error::Http(e) if e.is_connect() || e.is_timeout() => {
                "Unable to connect to the server. Please check your internet connection."
                    .to_string()
            }
            Error::Http(_) | Error::Io(_) => "Network error. Please try again.".to_string(),
            Error::Upload(message) => format!("Upload failed: {}", message),
            Error::Aborted => "Request cancelled.".to_string(),
            Error::Json(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Map an HTTP status to the message shown to the user.
/// `detail` is the server-provided message, used where the status allows it.
fn friendly_status_message(status: u16, detail: &str) -> String {
    let or_detail = |fallback: &str| {
        if detail.trim().is_empty() {
            fallback.to_string()
        } else {
            detail.to_string()
        }
    };
    match status {
        400 => or_detail("Invalid request. Please check your input."),
        401 => or_detail("Session expired. Please login again."),
        403 => "Access denied. You do not have permission to perform this action.".to_string(),
        404 => "The requested resource was not found. Please contact support if this persists."
            .to_string(),
        429 => "Too many requests. Please wait a moment and try again.".to_string(),
        500 => or_detail("Server error. Please try again later."),
        502..=504 => {
            "The server is temporarily unavailable. Please try again in a few moments.".to_string()
        }
        _ => or_detail("Something went wrong. Please try again."),
    }
}
