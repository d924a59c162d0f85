//! Proxy configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the proxy service.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Listen address (e.g., "0.0.0.0:3000").
    #[serde(default = "ProxyConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Base URL of the LLM API serving both agents, uploads and files.
    #[serde(default = "ProxyConfig::default_llm_api_base_url")]
    pub llm_api_base_url: String,

    /// Base URL of the main API (auth, invoices).
    #[serde(default = "ProxyConfig::default_api_base_url")]
    pub api_base_url: String,

    /// Allowed CORS origins.
    #[serde(default = "ProxyConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "ProxyConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Time allowed until response headers, in seconds.
    #[serde(default = "ProxyConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ProxyConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:3000".to_string()
    }

    fn default_llm_api_base_url() -> String {
        "http://localhost:8005".to_string()
    }

    fn default_api_base_url() -> String {
        "http://localhost:8000".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_max_body() -> usize {
        // 10 MB attachment plus multipart framing
        11 * 1024 * 1024
    }

    const fn default_request_timeout() -> u64 {
        300
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a variable lookup; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(v) = lookup("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            config.llm_api_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("API_BASE_URL") {
            config.api_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            config.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = lookup("MAX_BODY_BYTES") {
            config.max_body_bytes = v
                .parse()
                .map_err(|_| format!("MAX_BODY_BYTES is not a number: {}", v))?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout_seconds = v
                .parse()
                .map_err(|_| format!("REQUEST_TIMEOUT_SECONDS is not a number: {}", v))?;
        }
        Ok(config)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            llm_api_base_url: Self::default_llm_api_base_url(),
            api_base_url: Self::default_api_base_url(),
            cors_origins: Self::default_cors_origins(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}
