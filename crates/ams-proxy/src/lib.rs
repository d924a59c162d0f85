//! Server-side proxy routes for the chat client.
//!
//! The proxy sits between clients and two backends:
//!
//! ```text
//!   clients ──► ams-proxy ──► LLM API  (agent chat, uploads, files)
//!                         └─► main API (logout, invoices)
//! ```
//!
//! Both agent stream routes share one forwarding algorithm: upstream errors
//! before the first byte keep their status and JSON body, an unreachable
//! upstream is a 502, and a failure mid-stream is reported to the client as a
//! single `error` frame.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ProxyConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::ProxyState;
