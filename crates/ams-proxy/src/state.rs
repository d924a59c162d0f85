//! Proxy application state.

use crate::config::ProxyConfig;

/// Shared application state for the proxy.
#[derive(Debug, Clone)]
pub struct ProxyState {
    /// Client for upstream calls.
    pub http: reqwest::Client,
    /// Proxy configuration.
    pub config: ProxyConfig,
}

impl ProxyState {
    /// Create a new proxy state.
    #[must_use]
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// URL on the LLM API.
    pub fn llm_url(&self, path: &str) -> String {
        format!("{}{}", self.config.llm_api_base_url, path)
    }

    /// URL on the main API.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }
}
