//! Transport abstraction for opening chat turns

use ams_stream::{AgentClient, AgentKind, ChatRequest, EventStream};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Opens the event stream for one turn
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return its events. Failures before the first
    /// frame are returned here; later ones arrive through the stream.
    async fn open(
        &self,
        agent: AgentKind,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream>;
}

/// Transport over HTTP through [`AgentClient`]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: AgentClient,
}

impl HttpTransport {
    pub fn new(client: AgentClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AgentClient {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(
        &self,
        agent: AgentKind,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream> {
        Ok(self.client.stream_chat(agent, &request, cancel).await?)
    }
}
