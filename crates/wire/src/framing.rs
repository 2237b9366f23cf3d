use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use serde_json::Value;

use super::error::WireResult;

pub const DATA_PREFIX: &str = "data: ";
const BARE_DATA_PREFIX: &str = "data:";
const EVENT_PREFIX: &str = "event:";
const DONE_SENTINEL: &str = "[DONE]";

pub type RecordStream = BoxStream<'static, WireResult<Value>>;

/// Splits a byte stream into lines, carrying partial lines across chunks.
///
/// Bytes are buffered rather than text so a UTF-8 sequence split between two
/// chunks decodes intact once its line is complete.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // The carried tail holds no newline, so only the new bytes are scanned.
        let mut search_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.buffer[search_from..]
            .iter()
            .position(|byte| *byte == b'\n')
        {
            let end = search_from + offset;
            lines.push(decode_line(&self.buffer[line_start..end]));
            line_start = end + 1;
            search_from = line_start;
        }

        self.buffer.drain(..line_start);
        lines
    }

    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }

        let tail = std::mem::take(&mut self.buffer);
        Some(decode_line(&tail))
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameLine {
    Record(Value),
    /// Data line whose payload did not parse; dropped without ending the stream.
    Malformed(String),
    Ignored,
}

pub fn classify_line(line: &str) -> FrameLine {
    if line.starts_with(EVENT_PREFIX) {
        return FrameLine::Ignored;
    }

    let payload = match line.strip_prefix(DATA_PREFIX) {
        Some(payload) => payload,
        None => match line.strip_prefix(BARE_DATA_PREFIX) {
            Some(payload) => payload.trim_start(),
            None => return FrameLine::Ignored,
        },
    };

    let payload = payload.trim_end();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return FrameLine::Ignored;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(record) => FrameLine::Record(record),
        Err(error) => {
            tracing::debug!(
                stage = "parse-data-line",
                error = %error,
                payload_len = payload.len(),
                "dropping malformed stream record"
            );
            FrameLine::Malformed(payload.to_string())
        }
    }
}

struct DecodeState {
    chunks: BoxStream<'static, WireResult<Bytes>>,
    decoder: SseLineDecoder,
    ready: VecDeque<Value>,
    exhausted: bool,
}

impl DecodeState {
    fn enqueue(&mut self, line: &str) {
        if let FrameLine::Record(record) = classify_line(line) {
            self.ready.push_back(record);
        }
    }
}

/// Turns raw transport chunks into parsed records.
///
/// A transport error is yielded once and ends the stream; malformed records
/// never do.
pub fn decode_records<S>(chunks: S) -> RecordStream
where
    S: Stream<Item = WireResult<Bytes>> + Send + 'static,
{
    let state = DecodeState {
        chunks: chunks.boxed(),
        decoder: SseLineDecoder::new(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(record) = state.ready.pop_front() {
                return Some((Ok(record), state));
            }
            if state.exhausted {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    for line in state.decoder.push(&chunk) {
                        state.enqueue(&line);
                    }
                }
                Some(Err(error)) => {
                    state.exhausted = true;
                    return Some((Err(error), state));
                }
                None => {
                    state.exhausted = true;
                    if let Some(line) = state.decoder.finish() {
                        state.enqueue(&line);
                    }
                }
            }
        }
    })
    .boxed()
}
