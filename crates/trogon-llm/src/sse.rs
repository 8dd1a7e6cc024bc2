//! Server-sent-event plumbing shared by the provider backends.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use trogon_vault::ProviderTag;

use crate::error::LlmError;
use crate::types::{StreamPart, TokenStream};

/// Turns the `data:` payloads of one provider's event stream into parts.
pub(crate) trait EventParser: Send + 'static {
    fn on_data(&mut self, data: &str) -> Result<Vec<StreamPart>, LlmError>;

    /// Called once when the stream ends, normally or at `[DONE]`.
    fn finish(&mut self) -> Vec<StreamPart>;
}

/// Splits a byte stream into lines. Bytes are buffered until a full line is
/// available so multi-byte characters split across chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line[..pos]);
        Some(line.trim_end_matches('\r').to_string())
    }

    /// Whatever is left after the final newline.
    pub(crate) fn take_rest(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.buf).trim_end_matches('\r').to_string();
        self.buf.clear();
        Some(rest)
    }
}

/// Payload of a `data:` line, if it is one.
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(|d| d.strip_prefix(' ').unwrap_or(d))
}

struct State<P> {
    provider: ProviderTag,
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    lines: LineBuffer,
    parser: P,
    pending: VecDeque<Result<StreamPart, LlmError>>,
    done: bool,
}

impl<P: EventParser> State<P> {
    fn handle_line(&mut self, line: &str) {
        let Some(data) = data_payload(line) else {
            return;
        };
        if data == "[DONE]" {
            self.finish();
            return;
        }
        match self.parser.on_data(data) {
            Ok(parts) => self.pending.extend(parts.into_iter().map(Ok)),
            Err(err) => {
                self.pending.push_back(Err(err));
                self.done = true;
            }
        }
    }

    fn finish(&mut self) {
        if !self.done {
            self.pending.extend(self.parser.finish().into_iter().map(Ok));
            self.done = true;
        }
    }
}

/// Adapt a streaming HTTP response into a [`TokenStream`].
pub(crate) fn event_stream<P: EventParser>(
    provider: ProviderTag,
    response: reqwest::Response,
    parser: P,
) -> TokenStream {
    let state = State {
        provider,
        bytes: response.bytes_stream().boxed(),
        lines: LineBuffer::default(),
        parser,
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.lines.push(&chunk);
                    while !state.done {
                        let Some(line) = state.lines.next_line() else { break };
                        state.handle_line(&line);
                    }
                }
                Some(Err(err)) => {
                    state.pending.push_back(Err(LlmError::Stream {
                        provider: state.provider,
                        message: err.to_string(),
                    }));
                    state.done = true;
                }
                None => {
                    if let Some(rest) = state.lines.take_rest() {
                        state.handle_line(&rest);
                    }
                    state.finish();
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_splits_on_newlines() {
        let mut lines = LineBuffer::default();
        lines.push(b"data: one\r\ndata: tw");
        assert_eq!(lines.next_line().as_deref(), Some("data: one"));
        assert_eq!(lines.next_line(), None);
        lines.push(b"o\n");
        assert_eq!(lines.next_line().as_deref(), Some("data: two"));
        assert_eq!(lines.take_rest(), None);
    }

    #[test]
    fn line_buffer_keeps_split_utf8_intact() {
        let mut lines = LineBuffer::default();
        let text = "data: é\n".as_bytes();
        lines.push(&text[..7]);
        lines.push(&text[7..]);
        assert_eq!(lines.next_line().as_deref(), Some("data: é"));
    }

    #[test]
    fn data_payload_accepts_optional_space() {
        assert_eq!(data_payload("data: {}"), Some("{}"));
        assert_eq!(data_payload("data:{}"), Some("{}"));
        assert_eq!(data_payload("event: ping"), None);
    }
}
