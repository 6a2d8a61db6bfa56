//! Streaming response reducer
//!
//! Consumes the raw byte stream of a `streamGenerateContent` call and turns
//! it into gateway events. The body is one large JSON array delivered
//! incrementally; rather than waiting for the full document, the reducer
//! assembles logical lines and runs an explicit state machine over them:
//!
//! - `Scanning`: accumulate lines, emit a `Content` delta whenever a
//!   complete `"text": "..."` line shows up.
//! - `ErrorState`: an `"error":` marker was seen; buffer everything and
//!   surface the raw payload as one `Error` event at end of stream.
//! - `FunctionState`: a `"functionCall": {` marker was seen; buffer the
//!   whole document and decode it into one `ToolCall` event at end of
//!   stream.
//!
//! At most one of `ErrorState`/`FunctionState` is entered per stream, and
//! once entered no further `Content` is emitted. Lines are assembled before
//! any marker check, so a marker split across two reads cannot be missed.

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};

use crate::error::LlmError;
use crate::protocol::google::GoogleStreamEnvelope;
use crate::types::{EventStream, StreamEvent, ToolCallEvent};

const ERROR_MARKER: &str = "\"error\":";
const FUNCTION_MARKER: &str = "\"functionCall\": {";
const TEXT_MARKER: &str = "\"text\": \"";

/// Reducer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    ErrorState,
    FunctionState,
}

/// Incremental line-oriented reducer over an upstream byte stream
///
/// Feed raw chunks with [`feed`](Self::feed); close with
/// [`finish`](Self::finish) to obtain the terminal event.
#[derive(Debug)]
pub struct LineReducer {
    streaming: bool,
    state: State,
    /// Bytes received since the last newline
    pending: Vec<u8>,
    /// Logical record accumulated since the last delta extraction
    buffer: String,
    /// Concatenation of all deltas, for non-streaming aggregation
    aggregated: String,
}

impl LineReducer {
    /// Create a reducer; `streaming` selects delta emission versus
    /// end-of-stream aggregation
    pub const fn new(streaming: bool) -> Self {
        Self {
            streaming,
            state: State::Scanning,
            pending: Vec::new(),
            buffer: String::new(),
            aggregated: String::new(),
        }
    }

    /// Consume one raw chunk, returning any events it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        for byte in chunk {
            if *byte == b'\n' {
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                self.process_line(&line, &mut events);
            } else {
                self.pending.push(*byte);
            }
        }

        events
    }

    /// Close the stream and produce the terminal event
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Parse` when a function-call payload cannot be
    /// decoded into the expected shape.
    pub fn finish(mut self) -> Result<Vec<StreamEvent>, LlmError> {
        let mut events = Vec::new();

        if !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.process_line(&line, &mut events);
        }

        match self.state {
            State::ErrorState => events.push(StreamEvent::Error(self.buffer)),
            State::FunctionState => events.push(decode_function_call(&self.buffer)?),
            State::Scanning => {
                if self.streaming {
                    events.push(StreamEvent::Done);
                } else {
                    events.push(StreamEvent::Content(self.aggregated));
                }
            }
        }

        Ok(events)
    }

    /// Append a completed line to the record buffer and advance the machine
    fn process_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        self.buffer.push_str(line.trim_end_matches('\r'));

        if self.buffer.is_empty() || self.state != State::Scanning {
            return;
        }

        if self.buffer.contains(ERROR_MARKER) {
            self.state = State::ErrorState;
            return;
        }

        if self.buffer.contains(FUNCTION_MARKER) {
            self.state = State::FunctionState;
            return;
        }

        let Some(index) = self.buffer.find(TEXT_MARKER) else {
            // record not complete yet
            return;
        };

        let start = index + TEXT_MARKER.len();
        let end = self.buffer.len().saturating_sub(1);
        if start > end || !self.buffer.is_char_boundary(end) {
            tracing::debug!(line = %self.buffer, "dropping malformed text delta line");
            self.buffer.clear();
            return;
        }

        let delta = self.buffer[start..end].to_owned();
        self.buffer.clear();

        if self.streaming {
            events.push(StreamEvent::Content(delta));
        } else {
            self.aggregated.push_str(&delta);
        }
    }
}

/// Decode the buffered stream document into a single `ToolCall` event
///
/// The payload is the full response array; the call lives at
/// `candidates[0].content.parts[0].functionCall`. Upstream tool names use
/// an underscore where the gateway's wire format uses a hyphen, so the
/// first underscore is rewritten.
fn decode_function_call(payload: &str) -> Result<StreamEvent, LlmError> {
    let envelopes: Vec<GoogleStreamEnvelope> =
        serde_json::from_str(payload).map_err(|e| LlmError::Parse(format!("malformed function call payload: {e}")))?;

    let call = envelopes
        .first()
        .and_then(|envelope| envelope.candidates.first())
        .and_then(|candidate| candidate.content.parts.first())
        .and_then(|part| part.function_call.as_ref())
        .ok_or_else(|| LlmError::Parse("stream payload carries no function call".to_owned()))?;

    let arguments = serde_json::to_string_pretty(&call.args)
        .map_err(|e| LlmError::Parse(format!("unserializable function call args: {e}")))?;

    Ok(StreamEvent::ToolCall(ToolCallEvent {
        name: call.name.replacen('_', "-", 1),
        arguments,
    }))
}

/// Drive a [`LineReducer`] over an upstream byte stream
///
/// Transport failures mid-read surface as `Err` items; anything already
/// emitted stays emitted (the client may see a truncated stream followed by
/// an error frame).
pub fn reduce_stream<S, E>(bytes: S, streaming: bool) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + 'static,
{
    let items = bytes
        .map(Some)
        .chain(stream::once(async { None }))
        .scan(Some(LineReducer::new(streaming)), move |slot, item| {
            let out: Vec<Result<StreamEvent, LlmError>> = match item {
                Some(Ok(chunk)) => slot
                    .as_mut()
                    .map(|reducer| reducer.feed(&chunk).into_iter().map(Ok).collect())
                    .unwrap_or_default(),
                Some(Err(e)) => {
                    slot.take();
                    vec![Err(LlmError::Transport(e.to_string()))]
                }
                None => match slot.take() {
                    Some(reducer) => match reducer.finish() {
                        Ok(events) => events.into_iter().map(Ok).collect(),
                        Err(e) => vec![Err(e)],
                    },
                    None => Vec::new(),
                },
            };
            futures_util::future::ready(Some(out))
        })
        .map(stream::iter)
        .flatten();

    Box::pin(items)
}
