//! Stream event types and the incremental frame decoder
//!
//! The agent backends answer a chat request with a chunked body of frames:
//!
//! ```text
//! data: {"type":"start","thread_id":"..."}\n\n
//! data: {"type":"token","content":"..."}\n\n
//! data: {"type":"done","thread_id":"..."}\n\n
//! ```
//!
//! Chunk boundaries are arbitrary: a frame, or a multi-byte character inside
//! it, may be split across reads. [`FrameDecoder`] keeps both the partial
//! UTF-8 sequence and the partial frame until the next chunk completes them.

use std::pin::Pin;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::ToolCall;

/// Blank line terminating every frame
pub const FRAME_DELIMITER: &str = "\n\n";

/// Prefix of frames carrying an event payload
pub const DATA_PREFIX: &str = "data: ";

/// Events emitted by an agent backend during one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Turn accepted; carries the thread id
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },
    /// Content fragment to append to the agent message
    Token {
        #[serde(default)]
        content: String,
    },
    /// Reasoning fragment
    Thinking {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning_tokens: Option<u64>,
    },
    /// Tools invoked by the agent, in order
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<String>,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    /// A graph step finished
    StepComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<String>,
    },
    /// Reasoning token usage for the turn
    ThinkingStats {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning_tokens: Option<u64>,
    },
    /// Turn complete
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },
    /// The backend failed the turn
    Error { error: String },
}

impl StreamEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }

    /// Render as a complete wire frame
    pub fn to_frame(&self) -> Result<String> {
        Ok(format!(
            "{}{}{}",
            DATA_PREFIX,
            serde_json::to_string(self)?,
            FRAME_DELIMITER
        ))
    }
}

/// A stream of decoded events. `error` events arrive as `Err(Error::Stream)`
/// and end the stream.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Incremental decoder from body chunks to events
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a delimiter
    buffer: String,
}

impl FrameDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the events completed by it, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.decode_utf8(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find(FRAME_DELIMITER) {
            let frame: String = self.buffer.drain(..end + FRAME_DELIMITER.len()).collect();
            if let Some(event) = parse_frame(&frame[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Text received but not yet terminated by a delimiter
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Signal end of body. Returns the discarded unterminated remainder, if
    /// any; well-formed input never leaves one.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            self.buffer.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        let leftover = std::mem::take(&mut self.buffer);
        if leftover.trim().is_empty() {
            return None;
        }
        tracing::warn!(
            bytes = leftover.len(),
            "Stream ended with an unterminated frame, discarding it"
        );
        Some(leftover)
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        self.buffer.push_str(text);
                    }
                    match e.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + invalid);
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Parse one complete frame (delimiter already stripped).
/// Frames without the data prefix are ignored; malformed payloads are logged
/// and skipped.
pub fn parse_frame(frame: &str) -> Option<StreamEvent> {
    let payload = frame.strip_prefix(DATA_PREFIX)?;
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, payload, "Failed to parse stream event, skipping frame");
            None
        }
    }
}

/// Turn a chunked body into an ordered event stream.
///
/// An `error` event or a failed read ends the stream with an `Err`. When
/// `cancel` fires the remaining body is abandoned and the stream ends with
/// `Err(Error::Aborted)`.
pub fn decode_events<S, B, E>(body: S, cancel: CancellationToken) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    Box::pin(stream! {
        let mut body = Box::pin(body);
        let mut decoder = FrameDecoder::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                chunk = body.next() => Some(chunk),
            };

            let Some(chunk) = chunk else {
                tracing::debug!("Stream cancelled, abandoning body");
                yield Err(Error::Aborted);
                return;
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.push(bytes.as_ref()) {
                        if let StreamEvent::Error { error } = event {
                            yield Err(Error::Stream(error));
                            return;
                        }
                        yield Ok(event);
                    }
                }
                Some(Err(e)) => {
                    yield Err(e.into());
                    return;
                }
                None => break,
            }
        }

        decoder.finish();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = concat!(
        "data: {\"type\":\"start\",\"thread_id\":\"t1\"}\n\n",
        "data: {\"type\":\"token\",\"content\":\"Hel\"}\n\n",
        "data: {\"type\":\"token\",\"content\":\"lo\"}\n\n",
        "data: {\"type\":\"done\",\"thread_id\":\"t1\"}\n\n",
    );

    fn token_text(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Token { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_decodes_complete_turn() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(HELLO.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Start { thread_id: Some("t1".into()) },
                StreamEvent::Token { content: "Hel".into() },
                StreamEvent::Token { content: "lo".into() },
                StreamEvent::Done { thread_id: Some("t1".into()) },
            ]
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_content() {
        let body = concat!(
            "data: {\"type\":\"thinking\",\"content\":\"hmm\"}\n\n",
            "data: {\"type\":\"token\",\"content\":\"Grüße \"}\n\n",
            "data: {\"type\":\"token\",\"content\":\"aus 東京 🌍\"}\n\n",
            "data: {\"type\":\"token\",\"content\":\"!\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        )
        .as_bytes();

        let expected = "Grüße aus 東京 🌍!";
        for size in 1..=body.len() {
            let mut decoder = FrameDecoder::new();
            let mut events = Vec::new();
            for chunk in body.chunks(size) {
                events.extend(decoder.push(chunk));
            }
            assert_eq!(token_text(&events), expected, "chunk size {}", size);
            assert_eq!(events.len(), 5, "chunk size {}", size);
            assert!(decoder.finish().is_none());
        }
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let frame = "data: {\"type\":\"token\",\"content\":\"é\"}\n\n".as_bytes();
        let split = frame.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&frame[..split]).is_empty());
        let events = decoder.push(&frame[split..]);
        assert_eq!(events, vec![StreamEvent::Token { content: "é".into() }]);
    }

    #[test]
    fn test_partial_frame_kept_until_delimiter() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"token\",").is_empty());
        assert_eq!(decoder.buffered(), "data: {\"type\":\"token\",");
        assert!(decoder.push(b"\"content\":\"x\"}\n").is_empty());
        let events = decoder.push(b"\n");
        assert_eq!(events, vec![StreamEvent::Token { content: "x".into() }]);
        assert_eq!(decoder.buffered(), "");
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(
            concat!(
                "data: {\"type\":\"token\",\"content\":\"a\"}\n\n",
                "data: {not json}\n\n",
                "data: {\"type\":\"no_such_event\"}\n\n",
                "data: {\"type\":\"token\",\"content\":\"b\"}\n\n",
            )
            .as_bytes(),
        );
        assert_eq!(token_text(&events), "ab");
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_non_data_frames_ignored() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b": keep-alive\n\n\n\nevent: ping\n\ndata: {\"type\":\"done\"}\n\n");
        assert_eq!(events, vec![StreamEvent::Done { thread_id: None }]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut decoder = FrameDecoder::new();
        let mut body = b"data: {\"type\":\"token\",\"content\":\"a".to_vec();
        body.push(0xFF);
        body.extend_from_slice(b"b\"}\n\n");
        let events = decoder.push(&body);
        assert_eq!(events, vec![StreamEvent::Token { content: "a\u{FFFD}b".into() }]);
    }

    #[test]
    fn test_unterminated_trailing_frame_reported() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"data: {\"type\":\"token\",\"content\":\"a\"}\n\ndata: {\"type\":\"done\"}");
        assert_eq!(decoder.finish().as_deref(), Some("data: {\"type\":\"done\"}"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_parse_thinking_and_tool_calls() {
        let thinking = parse_frame(
            "data: {\"type\":\"thinking\",\"content\":\"step 1\",\"reasoning_tokens\":123}",
        );
        assert_eq!(
            thinking,
            Some(StreamEvent::Thinking {
                content: "step 1".into(),
                reasoning_tokens: Some(123),
            })
        );

        let tools = parse_frame(
            "data: {\"type\":\"tool_call\",\"step\":\"model\",\"tool_calls\":[{\"name\":\"search_rooms\",\"args\":{\"city\":\"Hanoi\"}},{\"name\":\"get_time\"}]}",
        );
        let Some(StreamEvent::ToolCall { step, tool_calls }) = tools else {
            panic!("expected tool_call, got {:?}", tools);
        };
        assert_eq!(step.as_deref(), Some("model"));
        assert_eq!(tool_calls.len(), 2);
        assert_eq!(tool_calls[0].name, "search_rooms");
        assert_eq!(tool_calls[0].args, Some(serde_json::json!({"city": "Hanoi"})));
        assert_eq!(tool_calls[1].args, None);
    }

    #[test]
    fn test_error_frame_renders_canonical_wire_form() {
        let frame = StreamEvent::Error { error: "boom".into() }.to_frame().unwrap();
        assert_eq!(frame, "data: {\"type\":\"error\",\"error\":\"boom\"}\n\n");
    }

    fn chunks(parts: Vec<std::result::Result<&'static [u8], Error>>) -> EventStream {
        decode_events(futures::stream::iter(parts), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_decode_events_in_order() {
        let bytes = HELLO.as_bytes();
        let (a, b) = bytes.split_at(17);
        let events: Vec<_> = chunks(vec![Ok(a), Ok(b)]).collect().await;
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.is_ok()));
        assert!(matches!(events[3], Ok(StreamEvent::Done { .. })));
    }

    #[tokio::test]
    async fn test_error_event_fails_the_stream() {
        let body: &'static [u8] = concat!(
            "data: {\"type\":\"token\",\"content\":\"a\"}\n\n",
            "data: {\"type\":\"error\",\"error\":\"backend exploded\"}\n\n",
            "data: {\"type\":\"token\",\"content\":\"never\"}\n\n",
        )
        .as_bytes();
        let events: Vec<_> = chunks(vec![Ok(body)]).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        match &events[1] {
            Err(Error::Stream(msg)) => assert_eq!(msg, "backend exploded"),
            other => panic!("expected stream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_not_silent_end() {
        let first: &'static [u8] = b"data: {\"type\":\"token\",\"content\":\"a\"}\n\n";
        let events: Vec<_> =
            chunks(vec![Ok(first), Err(Error::Stream("connection reset".into()))])
                .collect()
                .await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_err());
    }

    #[tokio::test]
    async fn test_cancellation_ends_with_aborted() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let body = futures::stream::pending::<std::result::Result<Vec<u8>, Error>>();
        let events: Vec<_> = decode_events(body, cancel).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(Error::Aborted)));
    }
}
