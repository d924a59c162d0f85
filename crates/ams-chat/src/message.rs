//! Conversation messages and the transient agent status

use ams_stream::{AttachmentRef, ToolCall};
use serde::{Deserialize, Serialize};

/// Ordinal message identifier, unique within a session
pub type MessageId = u64;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Text; append-only while `is_streaming`
    pub content: String,
    pub sender: Sender,
    /// Creation time (Unix ms)
    pub timestamp: i64,
    pub is_streaming: bool,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
}

impl Message {
    fn new(id: MessageId, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            sender,
            timestamp: chrono::Utc::now().timestamp_millis(),
            is_streaming: false,
            is_error: false,
            attachments: Vec::new(),
        }
    }

    /// A user turn as displayed
    pub fn user(id: MessageId, content: impl Into<String>, attachments: Vec<AttachmentRef>) -> Self {
        Self {
            attachments,
            ..Self::new(id, Sender::User, content)
        }
    }

    /// A finished agent message (greetings)
    pub fn agent(id: MessageId, content: impl Into<String>) -> Self {
        Self::new(id, Sender::Agent, content)
    }

    /// An agent message that is still receiving tokens
    pub fn streaming(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            is_streaming: true,
            ..Self::new(id, Sender::Agent, content)
        }
    }

    /// A synthesized failure notice
    pub fn error(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(id, Sender::Agent, content)
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// What the backend is doing before content tokens arrive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentStatus {
    /// Reasoning
    Thinking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning_tokens: Option<u64>,
    },
    /// Invoking tools
    ToolCall { tool_calls: Vec<ToolCall> },
}

impl AgentStatus {
    /// One-line summary for status displays
    pub fn describe(&self) -> String {
        match self {
            AgentStatus::Thinking {
                reasoning_tokens: Some(n),
            } => format!("Thinking... ({} reasoning tokens)", n),
            AgentStatus::Thinking { reasoning_tokens: None } => "Thinking...".to_string(),
            AgentStatus::ToolCall { tool_calls } => {
                let names: Vec<&str> = tool_calls.iter().map(|t| t.name.as_str()).collect();
                format!("Using tools: {}", names.join(", "))
            }
        }
    }
}
