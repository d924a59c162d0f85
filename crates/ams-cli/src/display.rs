//! Terminal rendering of chat events

use ams_chat::{ChatEvent, Sender, TurnOutcome};
use std::io::Write;
use tokio::sync::broadcast;

use crate::utils::truncate_chars;

/// Where a piece of output goes
#[derive(Debug, PartialEq)]
pub enum Output {
    /// Reply text, written to stdout without a newline
    Text(String),
    /// Status and diagnostics, one line on stderr
    Status(String),
    /// Error message, one line on stderr
    Error(String),
}

/// Turns chat events into terminal output
#[derive(Debug, Default)]
pub struct Renderer {
    show_thinking: bool,
    thinking_shown: usize,
}

impl Renderer {
    pub fn new(show_thinking: bool) -> Self {
        Self {
            show_thinking,
            thinking_shown: 0,
        }
    }

    pub fn render(&mut self, event: &ChatEvent) -> Vec<Output> {
        match event {
            ChatEvent::MessageAppended { message } => {
                if message.is_error {
                    vec![Output::Error(message.content.clone())]
                } else if message.sender == Sender::Agent && message.is_streaming {
                    vec![Output::Text(message.content.clone())]
                } else if message.sender == Sender::Agent {
                    vec![Output::Text(format!("{}\n", message.content))]
                } else {
                    vec![]
                }
            }
            ChatEvent::TokenAppended { delta, .. } => vec![Output::Text(delta.clone())],
            ChatEvent::MessageFinalized { .. } => vec![Output::Text("\n".to_string())],
            ChatEvent::MessageRemoved { .. } => {
                vec![Output::Status("\n[partial reply discarded]".to_string())]
            }
            ChatEvent::StatusChanged { status: Some(status) } => {
                vec![Output::Status(format!("[{}]", truncate_chars(&status.describe(), 120)))]
            }
            ChatEvent::ThinkingUpdated { thinking } => self.render_thinking(thinking),
            ChatEvent::TurnEnd {
                outcome: TurnOutcome::Aborted,
            } => vec![Output::Status("[stopped]".to_string())],
            ChatEvent::TurnEnd {
                outcome: TurnOutcome::Failed {
                    unauthenticated: true,
                    ..
                },
            } => vec![Output::Status("Login with: ams --login <token>".to_string())],
            _ => vec![],
        }
    }

    /// Print only the part of the accumulated thinking not shown yet
    fn render_thinking(&mut self, thinking: &str) -> Vec<Output> {
        if thinking.is_empty() {
            self.thinking_shown = 0;
            return vec![];
        }
        if !self.show_thinking {
            return vec![];
        }

        let start = if thinking.is_char_boundary(self.thinking_shown) {
            self.thinking_shown
        } else {
            0
        };
        self.thinking_shown = thinking.len();

        let new = thinking[start..].trim();
        if new.is_empty() {
            vec![]
        } else {
            vec![Output::Status(format!("(thinking) {}", new))]
        }
    }
}

/// Print a session's events until the current turn ends
pub async fn print_turn(receiver: &mut broadcast::Receiver<ChatEvent>, renderer: &mut Renderer) {
    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Display fell behind");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        for output in renderer.render(&event) {
            write_output(output);
        }
        if event.is_terminal() {
            break;
        }
    }
}

fn write_output(output: Output) {
    match output {
        Output::Text(text) => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        Output::Status(line) => eprintln!("{}", line),
        Output::Error(line) => eprintln!("Error: {}", line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ams_chat::{AgentStatus, Message};

    #[test]
    fn test_reply_streams_as_text() {
        let mut renderer = Renderer::new(false);
        assert_eq!(
            renderer.render(&ChatEvent::MessageAppended {
                message: Message::streaming(2, "Hel"),
            }),
            vec![Output::Text("Hel".to_string())]
        );
        assert_eq!(
            renderer.render(&ChatEvent::TokenAppended { id: 2, delta: "lo".to_string() }),
            vec![Output::Text("lo".to_string())]
        );
        assert_eq!(
            renderer.render(&ChatEvent::MessageFinalized { id: 2 }),
            vec![Output::Text("\n".to_string())]
        );
    }

    #[test]
    fn test_user_messages_are_not_echoed() {
        let mut renderer = Renderer::new(false);
        let event = ChatEvent::MessageAppended {
            message: Message::user(1, "hi", vec![]),
        };
        assert!(renderer.render(&event).is_empty());
    }

    #[test]
    fn test_error_and_login_hint() {
        let mut renderer = Renderer::new(false);
        assert_eq!(
            renderer.render(&ChatEvent::MessageAppended {
                message: Message::error(3, "Your session has expired. Please login again."),
            }),
            vec![Output::Error("Your session has expired. Please login again.".to_string())]
        );
        let end = ChatEvent::TurnEnd {
            outcome: TurnOutcome::Failed {
                message: "expired".to_string(),
                unauthenticated: true,
            },
        };
        assert_eq!(
            renderer.render(&end),
            vec![Output::Status("Login with: ams --login <token>".to_string())]
        );
    }

    #[test]
    fn test_status_line() {
        let mut renderer = Renderer::new(false);
        let event = ChatEvent::StatusChanged {
            status: Some(AgentStatus::Thinking { reasoning_tokens: None }),
        };
        assert_eq!(renderer.render(&event), vec![Output::Status("[Thinking...]".to_string())]);
        assert!(renderer.render(&ChatEvent::StatusChanged { status: None }).is_empty());
    }

    #[test]
    fn test_thinking_prints_only_new_text() {
        let mut renderer = Renderer::new(true);
        let update = |t: &str| ChatEvent::ThinkingUpdated { thinking: t.to_string() };

        assert_eq!(
            renderer.render(&update("Look")),
            vec![Output::Status("(thinking) Look".to_string())]
        );
        assert_eq!(
            renderer.render(&update("Looking up rooms")),
            vec![Output::Status("(thinking) ing up rooms".to_string())]
        );
        assert!(renderer.render(&update("")).is_empty());
        assert_eq!(
            renderer.render(&update("Next")),
            vec![Output::Status("(thinking) Next".to_string())]
        );
    }

    #[tokio::test]
    async fn test_print_turn_stops_at_turn_end() {
        let (tx, mut rx) = broadcast::channel(16);
        tx.send(ChatEvent::TokenAppended { id: 1, delta: "x".to_string() }).unwrap();
        tx.send(ChatEvent::TurnEnd { outcome: TurnOutcome::Completed }).unwrap();
        tx.send(ChatEvent::MessageFinalized { id: 9 }).unwrap();

        let mut renderer = Renderer::new(false);
        print_turn(&mut rx, &mut renderer).await;

        // Events after the turn stay queued for the next one
        assert!(matches!(rx.try_recv(), Ok(ChatEvent::MessageFinalized { id: 9 })));
    }

    #[test]
    fn test_thinking_hidden_by_default() {
        let mut renderer = Renderer::new(false);
        let event = ChatEvent::ThinkingUpdated { thinking: "secret".to_string() };
        assert!(renderer.render(&event).is_empty());
    }
}
