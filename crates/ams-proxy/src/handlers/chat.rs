//! Agent chat routes.
//!
//! - `POST /api/v2/chat/stream` (hotel, authenticated)
//! - `POST /api/v2/ds-agent/chat/stream`
//! - `POST /api/v2/chat` (hotel, authenticated)
//! - `POST /api/v2/ds-agent/chat`

use std::convert::Infallible;
use std::fmt::Display;

use ams_stream::{AgentKind, StreamEvent};
use async_stream::stream;
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::ProxyState;

const NO_TOKEN_MESSAGE: &str = "No authorization token provided";

/// `POST /api/v2/chat/stream`
pub async fn hotel_stream(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    forward_stream(&state, AgentKind::Hotel, &headers, body).await
}

/// `POST /api/v2/ds-agent/chat/stream`
pub async fn ds_stream(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    forward_stream(&state, AgentKind::DataScience, &headers, body).await
}

/// `POST /api/v2/chat`
pub async fn hotel_chat(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    forward_json(&state, AgentKind::Hotel, &headers, body).await
}

/// `POST /api/v2/ds-agent/chat`
pub async fn ds_chat(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    forward_json(&state, AgentKind::DataScience, &headers, body).await
}

/// The authorization header to forward. Authenticated agents reject
/// requests without one.
fn authorization(agent: AgentKind, headers: &HeaderMap) -> Result<Option<HeaderValue>, ApiError> {
    let auth = headers.get(AUTHORIZATION).cloned();
    if agent.requires_auth() && auth.is_none() {
        return Err(ApiError::Unauthorized(NO_TOKEN_MESSAGE.to_string()));
    }
    Ok(auth)
}

fn upstream_request(
    state: &ProxyState,
    path: &str,
    auth: Option<HeaderValue>,
    body: &Value,
) -> reqwest::RequestBuilder {
    let mut request = state.http.post(state.llm_url(path)).json(body);
    if let Some(auth) = auth {
        request = request.header(AUTHORIZATION, auth);
    }
    request
}

async fn forward_stream(
    state: &ProxyState,
    agent: AgentKind,
    headers: &HeaderMap,
    body: Value,
) -> Result<Response, ApiError> {
    let auth = authorization(agent, headers)?;
    tracing::debug!(%agent, "Forwarding chat stream");

    let upstream = upstream_request(state, agent.upstream_stream_path(), auth, &body)
        .send()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;

    if !upstream.status().is_success() {
        return Err(ApiError::from_upstream(
            upstream,
            json!({ "detail": format!("Failed to communicate with {}", agent.name()) }),
        )
        .await);
    }

    let body = Body::from_stream(relay_frames(upstream.bytes_stream()));
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response())
}

async fn forward_json(
    state: &ProxyState,
    agent: AgentKind,
    headers: &HeaderMap,
    body: Value,
) -> Result<Json<Value>, ApiError> {
    let auth = authorization(agent, headers)?;
    tracing::debug!(%agent, "Forwarding chat request");

    let upstream = upstream_request(state, agent.upstream_chat_path(), auth, &body)
        .send()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;

    if !upstream.status().is_success() {
        return Err(ApiError::from_upstream(
            upstream,
            json!({ "status": 500, "message": "Chat request failed", "data": null }),
        )
        .await);
    }

    upstream
        .json::<Value>()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_transport(&e))
}

/// Pass upstream bytes through unchanged. If the upstream read fails, end
/// the body with one `error` frame, starting a fresh frame if the failure
/// interrupted one.
pub fn relay_frames<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    stream! {
        let mut upstream = Box::pin(upstream);
        let mut tail = FrameTail::default();

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    tail.observe(&bytes);
                    yield Ok(bytes);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Upstream stream failed");
                    let mut frame = String::new();
                    if !tail.at_boundary() {
                        frame.push_str(ams_stream::stream::FRAME_DELIMITER);
                    }
                    frame.push_str(&error_frame(&e.to_string()));
                    yield Ok(Bytes::from(frame));
                    break;
                }
            }
        }
    }
}

fn error_frame(message: &str) -> String {
    StreamEvent::Error {
        error: message.to_string(),
    }
    .to_frame()
    .unwrap_or_else(|_| "data: {\"type\":\"error\",\"error\":\"Stream error occurred\"}\n\n".to_string())
}

/// Last two bytes relayed, to tell whether the body sits on a frame boundary
#[derive(Debug, Default)]
struct FrameTail {
    last: [u8; 2],
    seen: usize,
}

impl FrameTail {
    fn observe(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().rev().take(2).rev() {
            self.last = [self.last[1], b];
            self.seen += 1;
        }
    }

    fn at_boundary(&self) -> bool {
        self.seen == 0 || self.last == *b"\n\n"
    }
}
