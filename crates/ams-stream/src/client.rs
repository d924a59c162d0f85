//! HTTP client for the agent chat endpoints

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::CredentialProvider;
use crate::error::{Error, Result};
use crate::stream::{EventStream, decode_events};
use crate::types::{AgentKind, ChatRequest};

/// Shown when an authenticated agent is used without a stored token
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please login to continue chatting.";

/// Shown when the backend rejects the stored token
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please login again.";

/// Client for the chat and upload endpoints
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AgentClient {
    /// Create a client for the given base URL (e.g. `http://localhost:3000`)
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Token to send for this agent. Fails before any I/O when the agent
    /// requires one and none is stored.
    pub(crate) fn bearer_for(&self, agent: AgentKind) -> Result<Option<String>> {
        let token = self.credentials.get();
        if agent.requires_auth() && token.is_none() {
            return Err(Error::Unauthenticated(LOGIN_REQUIRED_MESSAGE.to_string()));
        }
        Ok(token)
    }

    /// Open a streamed chat turn.
    ///
    /// Returns once response headers arrive. A non-success status fails here,
    /// before any frame is read; everything after is delivered through the
    /// returned stream.
    pub async fn stream_chat(
        &self,
        agent: AgentKind,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream> {
        let token = self.bearer_for(agent)?;
        let url = self.url(agent.stream_path());

        tracing::debug!(%agent, url = %url, thread_id = ?request.thread_id, "Opening chat stream");

        let mut builder = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Aborted),
            response = builder.send() => response?,
        };

        let response = check_status(response).await?;
        Ok(decode_events(response.bytes_stream(), cancel))
    }

    /// Revoke the session on the main API, then forget the local token.
    ///
    /// The local token is cleared even when the server rejects the request.
    pub async fn logout(&self) -> Result<()> {
        let Some(token) = self.credentials.get() else {
            return Ok(());
        };

        let result = self
            .http
            .post(self.url(LOGOUT_PATH))
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await;
        self.credentials.clear();

        check_status(result?).await?;
        Ok(())
    }
}

/// Main API logout endpoint (served by the proxy)
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";

/// Map a non-success response to an error, consuming its body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();

    let embedded_status = parsed
        .as_ref()
        .and_then(|v| v.get("status"))
        .and_then(|s| s.as_u64());
    let message = parsed
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| body.trim().to_string());

    tracing::debug!(status = status.as_u16(), message = %message, "Request failed");

    if status == reqwest::StatusCode::UNAUTHORIZED || embedded_status == Some(401) {
        return Err(Error::Unauthenticated(SESSION_EXPIRED_MESSAGE.to_string()));
    }
    Err(Error::status(status.as_u16(), message))
}

/// Pull a message out of the error body shapes the backends use
fn error_message(body: &serde_json::Value) -> Option<String> {
    ["message", "detail", "error"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| v.as_str().map(str::to_string))
}
