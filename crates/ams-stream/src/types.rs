//! Core types shared by the client, the chat state machine and the proxy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The two selectable conversational agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    /// Hotel booking assistant (requires a bearer token)
    Hotel,
    /// Data-science assistant (accepts uploaded files)
    #[serde(rename = "ds-agent")]
    DataScience,
}

impl AgentKind {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Hotel => "Hotel Agent",
            AgentKind::DataScience => "Data Science Agent",
        }
    }

    /// Short identifier used in config files and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            AgentKind::Hotel => "hotel",
            AgentKind::DataScience => "ds",
        }
    }

    /// Parse a command-line / config identifier
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "hotel" | "hotel-agent" => Some(AgentKind::Hotel),
            "ds" | "ds-agent" | "data-science" => Some(AgentKind::DataScience),
            _ => None,
        }
    }

    /// All agent variants, in tab order
    pub fn all() -> [AgentKind; 2] {
        [AgentKind::DataScience, AgentKind::Hotel]
    }

    /// Whether requests must carry `Authorization: Bearer <token>`
    pub fn requires_auth(&self) -> bool {
        matches!(self, AgentKind::Hotel)
    }

    /// Client-facing streaming endpoint (served by the proxy)
    pub fn stream_path(&self) -> &'static str {
        match self {
            AgentKind::Hotel => "/api/v2/chat/stream",
            AgentKind::DataScience => "/api/v2/ds-agent/chat/stream",
        }
    }

    /// Backend streaming endpoint the proxy forwards to
    pub fn upstream_stream_path(&self) -> &'static str {
        match self {
            AgentKind::Hotel => "/api/v2/hotel-agent/chat/stream",
            AgentKind::DataScience => "/api/v2/ds-agent/chat/stream",
        }
    }

    /// Client-facing non-streaming endpoint
    pub fn chat_path(&self) -> &'static str {
        match self {
            AgentKind::Hotel => "/api/v2/chat",
            AgentKind::DataScience => "/api/v2/ds-agent/chat",
        }
    }

    /// Backend non-streaming endpoint
    pub fn upstream_chat_path(&self) -> &'static str {
        match self {
            AgentKind::Hotel => "/api/v2/hotel-agent/chat",
            AgentKind::DataScience => "/api/v2/ds-agent/chat",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A file that has been uploaded and can be referenced by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Original file name
    pub name: String,
    /// MIME type
    pub mime_type: String,
    /// Size in bytes
    pub byte_size: u64,
    /// Path returned by the upload endpoint
    pub stored_path: String,
    /// Local preview (images only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_preview: Option<PathBuf>,
}

impl AttachmentRef {
    /// Whether the attachment is an image
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A single tool invocation reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

/// Body of a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's text
    pub message: String,
    /// Backend correlation token, `null` on the first turn
    pub thread_id: Option<String>,
    /// Stored paths of uploaded attachments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_files: Option<Vec<String>>,
}

impl ChatRequest {
    /// Build a request; `uploaded_files` is omitted when there are no attachments
    pub fn new(
        message: impl Into<String>,
        thread_id: Option<String>,
        attachments: &[AttachmentRef],
    ) -> Self {
        let uploaded_files = if attachments.is_empty() {
            None
        } else {
            Some(attachments.iter().map(|a| a.stored_path.clone()).collect())
        };
        Self {
            message: message.into(),
            thread_id,
            uploaded_files,
        }
    }
}
