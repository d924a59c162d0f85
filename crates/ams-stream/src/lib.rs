//! ams-stream: Streaming client for the agent backends
//!
//! This crate talks to the hotel and data-science agent services: it opens the
//! streamed chat request, frames the response body into events, uploads
//! attachments, and reads the bearer token from an injected credential provider.

pub mod auth;
pub mod client;
pub mod error;
pub mod stream;
pub mod types;
pub mod upload;

pub use auth::{CredentialProvider, MemoryCredentials};
pub use client::{AgentClient, LOGIN_REQUIRED_MESSAGE, LOGOUT_PATH, SESSION_EXPIRED_MESSAGE};
pub use error::{Error, Result};
pub use stream::{EventStream, FrameDecoder, StreamEvent, decode_events};
pub use types::*;
pub use upload::{MAX_ATTACHMENT_BYTES, validate_attachment};
