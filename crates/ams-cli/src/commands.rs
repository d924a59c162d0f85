//! Slash commands for interactive mode

use ams_stream::AgentKind;
use std::path::PathBuf;

/// Result of parsing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Replay the last user turn
    Retry,
    /// Clear the active conversation
    Clear,
    /// Switch to another agent
    SwitchAgent(AgentKind),
    /// Upload a file for the next turn
    Attach(PathBuf),
    /// Drop a staged attachment (1-based, as listed)
    Detach(usize),
    /// Show the thread id and staged attachments
    Thread,
    /// Show a message to the user (not sent to the agent)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command. Returns `None` for plain chat input.
pub fn execute_command(input: &str, current: AgentKind) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let (command, args) = match rest.split_once(' ') {
        Some((command, args)) => (command.to_lowercase(), args.trim()),
        None => (rest.to_lowercase(), ""),
    };

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "retry" | "r" => CommandResult::Retry,

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "thread" | "t" => CommandResult::Thread,

        "agent" | "a" => agent_command(args, current),

        "attach" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /attach <path>".to_string())
            } else {
                CommandResult::Attach(PathBuf::from(args))
            }
        }

        "detach" => match args.parse::<usize>() {
            Ok(n) if n > 0 => CommandResult::Detach(n),
            _ => CommandResult::Message("Usage: /detach <number>".to_string()),
        },

        _ => CommandResult::Unknown(command),
    })
}

fn agent_command(args: &str, current: AgentKind) -> CommandResult {
    if args.is_empty() {
        let mut output = String::from("Agents:\n\n");
        for agent in AgentKind::all() {
            let marker = if agent == current { " *" } else { "" };
            output.push_str(&format!("  {:<6} {}{}\n", agent.id(), agent.name(), marker));
        }
        output.push_str("\nSwitch with: /agent <hotel|ds>");
        return CommandResult::Message(output);
    }

    match AgentKind::from_id(args) {
        Some(agent) => CommandResult::SwitchAgent(agent),
        None => CommandResult::Message(format!(
            "Unknown agent: '{}'\nValid agents: hotel, ds",
            args
        )),
    }
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?         Show this help message
  /agent, /a [name]     List agents or switch to one (hotel, ds)
  /attach <path>        Upload a file for the next message
  /detach <n>           Remove staged attachment n
  /retry, /r            Send the last message again
  /thread, /t           Show thread id and staged attachments
  /clear, /c            Start a new conversation with this agent
  /quit, /exit, /q      Exit

Ctrl-C while the agent is replying stops the reply.
Ctrl-C or Ctrl-D at the prompt exits, as does /exit."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(execute_command("hello there", AgentKind::Hotel), None);
    }

    #[test]
    fn test_basic_commands() {
        let agent = AgentKind::Hotel;
        assert_eq!(execute_command("/retry", agent), Some(CommandResult::Retry));
        assert_eq!(execute_command("  /CLEAR ", agent), Some(CommandResult::Clear));
        assert_eq!(execute_command("/q", agent), Some(CommandResult::Exit));
        assert_eq!(execute_command("/thread", agent), Some(CommandResult::Thread));
        assert_eq!(
            execute_command("/bogus", agent),
            Some(CommandResult::Unknown("bogus".to_string()))
        );
    }

    #[test]
    fn test_help_explains_stop_and_exit() {
        match execute_command("/help", AgentKind::Hotel) {
            Some(CommandResult::Message(text)) => {
                assert!(text.contains("Ctrl-C while the agent is replying stops the reply."));
                assert!(text.contains("Ctrl-C or Ctrl-D at the prompt exits"));
                assert!(text.contains("/exit"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_agent_switch() {
        assert_eq!(
            execute_command("/agent ds", AgentKind::Hotel),
            Some(CommandResult::SwitchAgent(AgentKind::DataScience))
        );
        match execute_command("/agent", AgentKind::Hotel) {
            Some(CommandResult::Message(text)) => assert!(text.contains("hotel  Hotel Agent *")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            execute_command("/agent spa", AgentKind::Hotel),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_attach_keeps_path_with_spaces() {
        assert_eq!(
            execute_command("/attach data/my sales.csv", AgentKind::DataScience),
            Some(CommandResult::Attach(PathBuf::from("data/my sales.csv")))
        );
        assert!(matches!(
            execute_command("/attach", AgentKind::DataScience),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_detach_is_one_based() {
        let agent = AgentKind::DataScience;
        assert_eq!(execute_command("/detach 2", agent), Some(CommandResult::Detach(2)));
        assert!(matches!(execute_command("/detach 0", agent), Some(CommandResult::Message(_))));
        assert!(matches!(execute_command("/detach x", agent), Some(CommandResult::Message(_))));
    }
}
