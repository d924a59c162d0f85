//! Chat observer events

use serde::{Deserialize, Serialize};

use crate::message::{AgentStatus, Message, MessageId};

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// `done` received or the stream closed
    Completed,
    /// The turn failed; an error message was appended
    Failed {
        message: String,
        unauthenticated: bool,
    },
    /// Cancelled through the handle
    Aborted,
}

/// Events emitted while a session changes state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A turn started; the user message is already appended
    TurnStart { user_message_id: MessageId },

    /// A message was added to the list
    MessageAppended { message: Message },

    /// Content appended to the streaming message
    TokenAppended { id: MessageId, delta: String },

    /// The streaming message stopped streaming
    MessageFinalized { id: MessageId },

    /// A partial message was dropped after a failure
    MessageRemoved { id: MessageId },

    /// Agent status changed
    StatusChanged { status: Option<AgentStatus> },

    /// Accumulated thinking text changed
    ThinkingUpdated { thinking: String },

    /// The backend assigned a thread id
    ThreadIdChanged { thread_id: String },

    /// Informational: a backend graph step finished
    StepComplete { step: Option<String> },

    /// Informational: reasoning token usage
    ThinkingStats { reasoning_tokens: Option<u64> },

    /// The turn ended; loading is false
    TurnEnd { outcome: TurnOutcome },
}

impl ChatEvent {
    /// Check if this is the last event of a turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::TurnEnd { .. })
    }
}
