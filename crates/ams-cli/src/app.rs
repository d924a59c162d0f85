//! Interactive application state: one chat session per agent

use ams_chat::{ChatEvent, ChatHandle, ChatSession, HttpTransport, PendingAttachments, TurnOutcome};
use ams_stream::{AgentClient, AgentKind, AttachmentRef};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::display::{Renderer, print_turn};
use crate::utils::format_size;

/// A session with the receiver and renderer that display its turns
struct Conversation {
    session: ChatSession,
    events: broadcast::Receiver<ChatEvent>,
    renderer: Renderer,
}

/// Sessions for every agent plus the attachments staged for the next turn.
///
/// Switching agents keeps each conversation and its thread id, like the
/// tabs of the web client.
pub struct App {
    client: AgentClient,
    config: Config,
    show_thinking: bool,
    active: AgentKind,
    conversations: HashMap<AgentKind, Conversation>,
    pending: PendingAttachments,
}

impl App {
    pub fn new(client: AgentClient, config: Config, agent: AgentKind, show_thinking: bool) -> Self {
        let mut app = Self {
            client,
            config,
            show_thinking,
            active: agent,
            conversations: HashMap::new(),
            pending: PendingAttachments::new(),
        };
        app.ensure_session(agent);
        app
    }

    pub fn active(&self) -> AgentKind {
        self.active
    }

    /// The session for the active agent
    pub fn session(&self) -> Option<&ChatSession> {
        self.conversations.get(&self.active).map(|c| &c.session)
    }

    /// Make `agent` the active conversation, creating it on first use
    pub fn switch(&mut self, agent: AgentKind) {
        self.active = agent;
        self.ensure_session(agent);
    }

    fn ensure_session(&mut self, agent: AgentKind) {
        if self.conversations.contains_key(&agent) {
            return;
        }

        let transport = Arc::new(HttpTransport::new(self.client.clone()));
        let mut session = ChatSession::new(agent, transport);
        if let Some(greeting) = self.config.greeting_for(agent) {
            println!("{}", greeting);
            session = session.with_greeting(greeting);
        }

        let credentials = Arc::clone(self.client.credentials());
        session.set_auth_invalidation_hook(move || {
            tracing::debug!("Clearing stored token after authentication failure");
            credentials.clear();
        });

        let events = session.subscribe();
        self.conversations.insert(
            agent,
            Conversation {
                session,
                events,
                renderer: Renderer::new(self.show_thinking),
            },
        );
    }

    /// Upload a file and stage it for the next turn
    pub async fn attach(&mut self, path: &Path) -> ams_stream::Result<AttachmentRef> {
        let attachment = self.client.upload(path).await?;
        self.pending.add(attachment.clone());
        Ok(attachment)
    }

    /// Drop a staged attachment by its 1-based position
    pub fn detach(&mut self, position: usize) -> Option<AttachmentRef> {
        self.pending.remove(position.checked_sub(1)?)
    }

    /// Send a message with the staged attachments, printing the reply
    pub async fn send(&mut self, text: &str) -> Option<TurnOutcome> {
        let attachments = self.pending.take();
        let Conversation {
            session,
            events,
            renderer,
        } = self.conversations.get_mut(&self.active)?;

        let watcher = abort_on_ctrl_c(session.handle());
        let (outcome, ()) = tokio::join!(
            session.submit_user_turn(text, attachments),
            print_turn(events, renderer)
        );
        watcher.abort();
        Some(outcome)
    }

    /// Replay the last user turn of the active conversation
    pub async fn retry(&mut self) -> Option<TurnOutcome> {
        let Conversation {
            session,
            events,
            renderer,
        } = self.conversations.get_mut(&self.active)?;
        if session.is_loading() || session.last_user_message().is_none() {
            return None;
        }

        let watcher = abort_on_ctrl_c(session.handle());
        let (outcome, ()) = tokio::join!(session.retry(), print_turn(events, renderer));
        watcher.abort();
        outcome
    }

    /// Start the active conversation over, keeping its greeting
    pub fn clear(&mut self) {
        if let Some(conversation) = self.conversations.get_mut(&self.active) {
            conversation.session.clear();
        }
    }

    /// Thread id and staged attachments of the active conversation
    pub fn describe_thread(&self) -> String {
        let mut output = format!("{}\n", self.active.name());
        match self.session().and_then(|s| s.thread_id()) {
            Some(thread_id) => output.push_str(&format!("  thread: {}\n", thread_id)),
            None => output.push_str("  thread: (new)\n"),
        }
        let messages = self.session().map(|s| s.messages().len()).unwrap_or(0);
        output.push_str(&format!("  messages: {}\n", messages));

        if self.pending.is_empty() {
            output.push_str("  attachments: none");
        } else {
            output.push_str("  attachments:");
            for (i, attachment) in self.pending.iter().enumerate() {
                output.push_str(&format!(
                    "\n    {}. {} ({}, {})",
                    i + 1,
                    attachment.name,
                    attachment.mime_type,
                    format_size(attachment.byte_size)
                ));
            }
        }
        output
    }
}

/// Abort the running turn through its handle on Ctrl-C
fn abort_on_ctrl_c(handle: ChatHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ams_stream::MemoryCredentials;

    fn app(config: Config) -> App {
        let client = AgentClient::new("http://127.0.0.1:1", Arc::new(MemoryCredentials::new()));
        App::new(client, config, AgentKind::DataScience, false)
    }

    #[tokio::test]
    async fn test_switch_keeps_each_conversation() {
        let config = Config {
            hotel_greeting: Some("Welcome".to_string()),
            ..Config::default()
        };
        let mut app = app(config);
        assert_eq!(app.session().unwrap().messages().len(), 0);

        app.switch(AgentKind::Hotel);
        assert_eq!(app.active(), AgentKind::Hotel);
        assert_eq!(app.session().unwrap().messages()[0].content, "Welcome");

        app.switch(AgentKind::DataScience);
        assert_eq!(app.conversations.len(), 2);
    }

    #[tokio::test]
    async fn test_hotel_without_token_fails_with_login_prompt() {
        let mut app = app(Config::default());
        app.switch(AgentKind::Hotel);

        let outcome = app.send("book a room").await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Failed {
                message: ams_stream::LOGIN_REQUIRED_MESSAGE.to_string(),
                unauthenticated: true,
            }
        );
        let messages = app.session().unwrap().messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_error);
    }

    #[tokio::test]
    async fn test_retry_without_history_is_noop() {
        let mut app = app(Config::default());
        assert!(app.retry().await.is_none());
        assert!(app.session().unwrap().messages().is_empty());
    }

    #[tokio::test]
    async fn test_detach_is_one_based() {
        let mut app = app(Config::default());
        app.pending.add(AttachmentRef {
            name: "a.csv".to_string(),
            mime_type: "text/csv".to_string(),
            byte_size: 10,
            stored_path: "uploads/files/a.csv".to_string(),
            local_preview: None,
        });

        assert!(app.detach(0).is_none());
        assert!(app.detach(2).is_none());
        assert_eq!(app.detach(1).unwrap().name, "a.csv");
        assert!(app.pending.is_empty());
    }

    #[tokio::test]
    async fn test_describe_thread_lists_attachments() {
        let mut app = app(Config::default());
        assert!(app.describe_thread().contains("thread: (new)"));

        app.pending.add(AttachmentRef {
            name: "sales.xlsx".to_string(),
            mime_type: "application/vnd.ms-excel".to_string(),
            byte_size: 2048,
            stored_path: "uploads/files/sales.xlsx".to_string(),
            local_preview: None,
        });
        assert!(app.describe_thread().contains("1. sales.xlsx (application/vnd.ms-excel, 2.0 KB)"));
    }
}
