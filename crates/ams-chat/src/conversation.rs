//! Conversation state: messages, agent status, thinking text, loading, thread id.

use crate::message::{AgentStatus, Message, MessageId};

/// Conversation state owned by one chat session.
///
/// At most one message has `is_streaming` set at a time.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    /// Conversation messages, in display order
    pub messages: Vec<Message>,
    /// Transient backend activity indicator
    pub agent_status: Option<AgentStatus>,
    /// Reasoning text accumulated during the current turn
    pub thinking: String,
    /// Whether a turn is in flight
    pub is_loading: bool,
    /// Backend correlation token
    pub thread_id: Option<String>,
    next_id: MessageId,
}

impl ChatState {
    /// Allocate the next message id
    pub(crate) fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Remove a message by id, returning it
    pub(crate) fn remove(&mut self, id: MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// The most recent user message
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }

    /// The message currently receiving tokens, if any
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_streaming)
    }
}
