//! Chat session: turn execution, event dispatch, and the retry/error policy

use std::sync::Arc;

use ams_stream::{AgentKind, AttachmentRef, ChatRequest, StreamEvent};
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    attachments::{annotate, strip_annotation},
    conversation::ChatState,
    error::{Error, Result},
    events::{ChatEvent, TurnOutcome},
    handle::ChatHandle,
    message::{AgentStatus, Message, MessageId},
    transport::Transport,
};

/// Called when the backend reports the session as unauthenticated
pub type AuthInvalidationHook = Arc<dyn Fn() + Send + Sync>;

/// One conversation with one agent
pub struct ChatSession {
    agent: AgentKind,
    state: ChatState,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<ChatEvent>,
    handle: ChatHandle,
    greeting: Option<String>,
    on_unauthenticated: Option<AuthInvalidationHook>,
}

impl ChatSession {
    /// Create a new session
    pub fn new(agent: AgentKind, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            agent,
            state: ChatState::default(),
            transport,
            event_tx,
            handle: ChatHandle::new(),
            greeting: None,
            on_unauthenticated: None,
        }
    }

    /// Open the conversation with an agent greeting
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self.push_greeting();
        self
    }

    /// Set the hook run once per unauthenticated failure, before cleanup
    pub fn set_auth_invalidation_hook(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.on_unauthenticated = Some(Arc::new(hook));
    }

    /// Subscribe to chat events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    /// Get the current state
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.state.thread_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    /// Get a cloneable handle for aborting from other tasks
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    /// Abort the turn in flight
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// The most recent user message, the one `retry` would replay
    pub fn last_user_message(&self) -> Option<&Message> {
        self.state.last_user_message()
    }

    /// Start over: drop all messages and the thread id, keep the greeting
    pub fn clear(&mut self) {
        self.state = ChatState::default();
        self.push_greeting();
    }

    fn push_greeting(&mut self) {
        if let Some(greeting) = self.greeting.clone() {
            let id = self.state.allocate_id();
            self.state.messages.push(Message::agent(id, greeting));
        }
    }

    /// Run one turn: append the user message, stream the reply, and apply the
    /// error policy on failure.
    ///
    /// Callers must not submit while [`is_loading`](Self::is_loading) is true;
    /// input surfaces are expected to ignore submissions during a turn.
    /// Failures never escape: they become an error message and a
    /// [`TurnOutcome::Failed`].
    pub async fn submit_user_turn(
        &mut self,
        text: &str,
        attachments: Vec<AttachmentRef>,
    ) -> TurnOutcome {
        let cancel = self.handle.begin_turn();

        let user_id = self.state.allocate_id();
        let user_message = Message::user(user_id, annotate(text, &attachments), attachments.clone());
        self.state.messages.push(user_message.clone());
        self.emit(ChatEvent::MessageAppended { message: user_message });

        self.state.is_loading = true;
        self.set_status(None);
        self.clear_thinking();
        self.emit(ChatEvent::TurnStart { user_message_id: user_id });

        // Reserved before any event arrives; the first token creates it
        let reply_id = self.state.allocate_id();
        let request = ChatRequest::new(text, self.state.thread_id.clone(), &attachments);

        tracing::debug!(agent = %self.agent, thread_id = ?request.thread_id, "Starting turn");

        let outcome = match self.run_turn(request, reply_id, &cancel).await {
            Ok(()) => {
                self.finalize(reply_id);
                TurnOutcome::Completed
            }
            Err(e) if e.is_aborted() => {
                tracing::debug!("Turn aborted");
                self.finalize(reply_id);
                TurnOutcome::Aborted
            }
            Err(e) => self.fail(reply_id, e),
        };

        self.state.is_loading = false;
        self.handle.end_turn();
        self.emit(ChatEvent::TurnEnd {
            outcome: outcome.clone(),
        });

        outcome
    }

    /// Replay the last user turn with its original text and attachments.
    ///
    /// Returns `None` without touching state when there is nothing to retry
    /// or a turn is in flight.
    pub async fn retry(&mut self) -> Option<TurnOutcome> {
        if self.state.is_loading {
            tracing::debug!("Retry ignored while a turn is in flight");
            return None;
        }
        let last = self.state.last_user_message()?;
        let text = strip_annotation(&last.content).to_string();
        let attachments = last.attachments.clone();

        Some(self.submit_user_turn(&text, attachments).await)
    }

    /// Consume the turn's events in order until `done`, stream end, or failure
    async fn run_turn(
        &mut self,
        request: ChatRequest,
        reply_id: MessageId,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        let mut events = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ams_stream::Error::Aborted.into()),
            opened = transport.open(self.agent, request, cancel.clone()) => opened?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ams_stream::Error::Aborted.into()),
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    if self.apply_event(event, reply_id)? {
                        return Ok(());
                    }
                    // One chunk can carry many frames; let subscribers drain
                    // the bounded channel before it overflows.
                    tokio::task::yield_now().await;
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    tracing::debug!("Stream closed without done");
                    return Ok(());
                }
            }
        }
    }

    /// Apply one event. Returns true when the turn is complete.
    fn apply_event(&mut self, event: StreamEvent, reply_id: MessageId) -> Result<bool> {
        match event {
            StreamEvent::Start { thread_id } => {
                if let Some(thread_id) = thread_id {
                    self.set_thread_id(thread_id);
                }
            }
            StreamEvent::Thinking {
                content,
                reasoning_tokens,
            } => {
                self.state.thinking.push_str(&content);
                self.emit(ChatEvent::ThinkingUpdated {
                    thinking: self.state.thinking.clone(),
                });
                self.set_status(Some(AgentStatus::Thinking { reasoning_tokens }));
            }
            StreamEvent::ToolCall { tool_calls, .. } => {
                tracing::debug!(count = tool_calls.len(), "Tools invoked");
                self.set_status(Some(AgentStatus::ToolCall { tool_calls }));
            }
            StreamEvent::Token { content } => {
                if let Some(message) = self.state.message_mut(reply_id) {
                    message.content.push_str(&content);
                    self.emit(ChatEvent::TokenAppended {
                        id: reply_id,
                        delta: content,
                    });
                } else {
                    self.set_status(None);
                    self.clear_thinking();
                    let message = Message::streaming(reply_id, content);
                    self.state.messages.push(message.clone());
                    self.emit(ChatEvent::MessageAppended { message });
                }
            }
            StreamEvent::StepComplete { step } => {
                tracing::debug!(step = ?step, "Step complete");
                self.emit(ChatEvent::StepComplete { step });
            }
            StreamEvent::ThinkingStats { reasoning_tokens } => {
                self.emit(ChatEvent::ThinkingStats { reasoning_tokens });
            }
            StreamEvent::Done { thread_id } => {
                if let Some(thread_id) = thread_id {
                    self.set_thread_id(thread_id);
                }
                return Ok(true);
            }
            StreamEvent::Error { error } => {
                return Err(ams_stream::Error::Stream(error).into());
            }
        }
        Ok(false)
    }

    /// Stop streaming the reply, keeping whatever content arrived
    fn finalize(&mut self, reply_id: MessageId) {
        self.set_status(None);
        self.clear_thinking();
        if let Some(message) = self.state.message_mut(reply_id) {
            if message.is_streaming {
                message.is_streaming = false;
                self.emit(ChatEvent::MessageFinalized { id: reply_id });
            }
        }
    }

    /// Drop the partial reply and append an error message
    fn fail(&mut self, reply_id: MessageId, error: Error) -> TurnOutcome {
        let unauthenticated = error.is_unauthenticated();
        if unauthenticated {
            if let Some(hook) = &self.on_unauthenticated {
                hook();
            }
        }

        self.set_status(None);
        self.clear_thinking();
        if self.state.remove(reply_id).is_some() {
            self.emit(ChatEvent::MessageRemoved { id: reply_id });
        }

        let text = error.user_message();
        tracing::error!(agent = %self.agent, error = %error, "Turn failed");

        let id = self.state.allocate_id();
        let message = Message::error(id, text.clone());
        self.state.messages.push(message.clone());
        self.emit(ChatEvent::MessageAppended { message });

        TurnOutcome::Failed {
            message: text,
            unauthenticated,
        }
    }

    fn set_status(&mut self, status: Option<AgentStatus>) {
        if self.state.agent_status != status {
            self.state.agent_status = status.clone();
            self.emit(ChatEvent::StatusChanged { status });
        }
    }

    fn clear_thinking(&mut self) {
        if !self.state.thinking.is_empty() {
            self.state.thinking.clear();
            self.emit(ChatEvent::ThinkingUpdated {
                thinking: String::new(),
            });
        }
    }

    fn set_thread_id(&mut self, thread_id: String) {
        if self.state.thread_id.as_deref() != Some(thread_id.as_str()) {
            self.state.thread_id = Some(thread_id.clone());
            self.emit(ChatEvent::ThreadIdChanged { thread_id });
        }
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }
}
