//! Configuration file support

use ams_stream::AgentKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Proxy the client talks to when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Configuration for ams
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat proxy
    pub base_url: Option<String>,
    /// Agent selected at startup (hotel, ds)
    pub agent: Option<String>,
    /// Opening message of the hotel conversation
    pub hotel_greeting: Option<String>,
    /// Opening message of the data-science conversation
    pub ds_greeting: Option<String>,
    /// Print the agent's reasoning as it streams
    pub show_thinking: Option<bool>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ams")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("AMS_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            agent: Some(AgentKind::DataScience.id().to_string()),
            hotel_greeting: None,
            ds_greeting: None,
            show_thinking: Some(false),
        };

        default_config.save()?;
        Ok(path)
    }

    /// Base URL, falling back to the local proxy
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Greeting configured for an agent, if any
    pub fn greeting_for(&self, agent: AgentKind) -> Option<&str> {
        let greeting = match agent {
            AgentKind::Hotel => self.hotel_greeting.as_deref(),
            AgentKind::DataScience => self.ds_greeting.as_deref(),
        };
        greeting.filter(|g| !g.trim().is_empty())
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# ams configuration file
# Place at ~/.config/ams/config.toml (Linux/Mac) or %APPDATA%\ams\config.toml (Windows)

# Chat proxy to talk to
base_url = "http://localhost:3000"

# Agent selected at startup (hotel, ds)
agent = "ds"

# Print the agent's reasoning while it thinks
show_thinking = false

# Opening messages (optional)
# hotel_greeting = "Hello! How can I help with your stay?"
# ds_greeting = "Hi! Upload a dataset or ask me a question."
"#
}
