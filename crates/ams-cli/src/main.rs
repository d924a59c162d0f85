//! ams - terminal chat client for the hotel and data-science agents

mod app;
mod commands;
mod config;
mod credentials;
mod display;
mod utils;

use ams_chat::TurnOutcome;
use ams_stream::{AgentClient, AgentKind, CredentialProvider};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::App;
use crate::credentials::FileCredentials;

/// ams - chat with the hotel and data-science agents
#[derive(Parser, Debug)]
#[command(name = "ams")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent to talk to (hotel, ds)
    #[arg(short, long)]
    agent: Option<String>,

    /// Base URL of the chat proxy
    #[arg(long)]
    base_url: Option<String>,

    /// Send a single message and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Upload a file and attach it to the first message (repeatable)
    #[arg(long)]
    attach: Vec<PathBuf>,

    /// Print the agent's reasoning as it streams
    #[arg(long)]
    thinking: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Store an access token for the hotel agent
    #[arg(long)]
    login: Option<String>,

    /// Revoke and forget the stored access token
    #[arg(long)]
    logout: bool,

    /// Show whether an access token is stored
    #[arg(long)]
    auth_status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("ams=debug,ams_chat=debug,ams_stream=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let credentials = Arc::new(FileCredentials::open_default());

    if let Some(token) = args.login {
        return handle_login(&credentials, token);
    }

    if args.auth_status {
        return show_auth_status(&credentials);
    }

    // CLI takes precedence over the config file
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| cfg.base_url().to_string());
    let client = AgentClient::new(base_url, credentials.clone());

    if args.logout {
        return handle_logout(&client).await;
    }

    let agent_id = args
        .agent
        .clone()
        .or(cfg.agent.clone())
        .unwrap_or_else(|| AgentKind::DataScience.id().to_string());
    let Some(agent) = AgentKind::from_id(&agent_id) else {
        eprintln!("Unknown agent: {}", agent_id);
        eprintln!("Available agents: hotel, ds");
        std::process::exit(1);
    };

    let show_thinking = args.thinking || cfg.show_thinking.unwrap_or(false);
    let mut app = App::new(client, cfg, agent, show_thinking);

    for path in &args.attach {
        if let Err(e) = attach(&mut app, path).await {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    // Non-interactive mode
    if let Some(command) = args.command {
        return run_command(&mut app, &command).await;
    }

    run_interactive(&mut app).await
}

async fn run_command(app: &mut App, command: &str) -> anyhow::Result<()> {
    if let Some(TurnOutcome::Failed { .. }) = app.send(command).await {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive(app: &mut App) -> anyhow::Result<()> {
    use std::io::{self, Write};
    use utils::Input;

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("ams ({}) - /help for commands", app.active().name());
        eprintln!();
    }

    loop {
        print!("{}> ", app.active().id());
        io::stdout().flush()?;

        let input = match utils::next_input(utils::read_stdin_line(), utils::ctrl_c()).await? {
            Input::Line(line) => line,
            Input::Eof => break,
            Input::Interrupted => {
                println!();
                // The pending stdin read would block runtime shutdown
                std::process::exit(130);
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input, app.active()) {
            match result {
                commands::CommandResult::Retry => {
                    if app.retry().await.is_none() {
                        println!("Nothing to retry.");
                    }
                }
                commands::CommandResult::Clear => {
                    app.clear();
                    println!("Cleared conversation.");
                }
                commands::CommandResult::SwitchAgent(agent) => {
                    app.switch(agent);
                    println!("Switched to: {}", agent.name());
                }
                commands::CommandResult::Attach(path) => {
                    if let Err(e) = attach(app, &path).await {
                        println!("Error: {}", e);
                    }
                }
                commands::CommandResult::Detach(position) => match app.detach(position) {
                    Some(attachment) => println!("Removed {}", attachment.name),
                    None => println!("No attachment #{}", position),
                },
                commands::CommandResult::Thread => {
                    println!("{}", app.describe_thread());
                }
                commands::CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                commands::CommandResult::Exit => {
                    break;
                }
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        app.send(input).await;
    }

    Ok(())
}

async fn attach(app: &mut App, path: &std::path::Path) -> ams_stream::Result<()> {
    println!("Uploading {}...", path.display());
    let attachment = app.attach(path).await?;
    println!(
        "Attached {} ({}). It will be sent with your next message.",
        attachment.name,
        utils::format_size(attachment.byte_size)
    );
    Ok(())
}

fn handle_login(credentials: &FileCredentials, token: String) -> anyhow::Result<()> {
    let token = token.trim().to_string();
    if token.is_empty() {
        eprintln!("Token must not be empty");
        std::process::exit(1);
    }

    credentials.set(token);
    if credentials.load().is_none() {
        eprintln!("Failed to save token to {}", credentials.path().display());
        std::process::exit(1);
    }

    println!("Token saved to {}", credentials.path().display());
    Ok(())
}

async fn handle_logout(client: &AgentClient) -> anyhow::Result<()> {
    if client.credentials().get().is_none() {
        println!("Not logged in.");
        return Ok(());
    }

    match client.logout().await {
        Ok(()) => println!("Successfully logged out."),
        Err(e) => {
            // The local token is gone either way
            eprintln!("Server logout failed: {}", e.user_message());
            println!("Local token removed.");
        }
    }
    Ok(())
}

fn show_auth_status(credentials: &FileCredentials) -> anyhow::Result<()> {
    println!("Authentication Status");
    println!("{}", "-".repeat(40));

    let status = if let Some(stored) = credentials.load() {
        let saved = chrono::DateTime::from_timestamp_millis(stored.saved_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!("Logged in (token saved: {})", saved)
    } else if credentials.from_env() {
        format!("Logged in (from {})", credentials::TOKEN_ENV_VAR)
    } else {
        "Not logged in".to_string()
    };

    for agent in AgentKind::all() {
        let line = if agent.requires_auth() {
            status.as_str()
        } else {
            "No login required"
        };
        println!("{:<25} {}", agent.name(), line);
    }

    println!();
    println!("Login with: ams --login <token>");
    println!("Logout with: ams --logout");

    Ok(())
}
