//! Error types for ams-chat

use thiserror::Error;

/// Result type alias using ams-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a chat turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the stream client
    #[error(transparent)]
    Stream(#[from] ams_stream::Error),
}

impl Error {
    /// Whether the auth-invalidation hook should run
    pub fn is_unauthenticated(&self) -> bool {
        match self {
            Error::Stream(e) => e.is_unauthenticated(),
        }
    }

    /// Whether the turn was cancelled rather than failed
    pub fn is_aborted(&self) -> bool {
        match self {
            Error::Stream(e) => e.is_aborted(),
        }
    }

    /// Text for the error message appended to the conversation
    pub fn user_message(&self) -> String {
        match self {
            Error::Stream(e) => e.user_message(),
        }
    }
}
