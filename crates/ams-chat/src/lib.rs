//! ams-chat: Chat state machine for the agent backends
//!
//! This crate owns the conversation: it appends the user's turn, consumes the
//! event stream from a [`Transport`], keeps the streaming agent message and
//! the transient agent status up to date, and applies the retry/error policy.

pub mod attachments;
pub mod chat;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod message;
pub mod transport;

pub use attachments::{PendingAttachments, annotate, strip_annotation};
pub use chat::ChatSession;
pub use conversation::ChatState;
pub use error::Error;
pub use events::{ChatEvent, TurnOutcome};
pub use handle::ChatHandle;
pub use message::{AgentStatus, Message, MessageId, Sender};
pub use transport::{HttpTransport, Transport};
