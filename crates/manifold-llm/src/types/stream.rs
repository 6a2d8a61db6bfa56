use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Event produced while consuming an upstream response
///
/// Exactly one terminal event is produced per request: `Error`, `Done`
/// (streaming mode), or the aggregated `Content`/`ToolCall` that closes a
/// non-streaming response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Incremental or aggregated text content
    Content(String),
    /// A synthesized or native function call
    ToolCall(ToolCallEvent),
    /// Upstream error payload, surfaced verbatim
    Error(String),
    /// Streaming-mode end-of-stream sentinel, rendered as `[DONE]`
    Done,
}

/// Function call extracted from an upstream response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallEvent {
    /// Tool name, in the gateway's hyphenated form
    pub name: String,
    /// Pretty-printed JSON arguments
    pub arguments: String,
}

/// Boxed stream of gateway events
///
/// `Err` items carry transport-level failures; upstream error payloads
/// travel as `StreamEvent::Error` so the raw body reaches the client.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;
