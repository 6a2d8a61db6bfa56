//! Coze bot API wire format types

use serde::{Deserialize, Serialize};

/// Coze chat request
#[derive(Debug, Clone, Serialize)]
pub struct CozeRequest {
    /// Bot to converse with
    pub bot_id: String,
    /// Merged conversation query
    pub query: String,
    /// Always true; the gateway consumes the SSE stream either way
    pub stream: bool,
}

/// One SSE data payload of a Coze stream
#[derive(Debug, Clone, Deserialize)]
pub struct CozeChunk {
    /// Event discriminator (`message`, `done`, `error`)
    #[serde(default)]
    pub event: String,
    /// Message payload for `message` events
    #[serde(default)]
    pub message: Option<CozeMessage>,
    /// Error text for `error` events
    #[serde(default)]
    pub error_information: Option<CozeErrorInformation>,
}

/// Message payload within a Coze event
#[derive(Debug, Clone, Deserialize)]
pub struct CozeMessage {
    /// Message type; only `answer` carries user-facing content
    #[serde(default, rename = "type")]
    pub message_type: String,
    /// Message content
    #[serde(default)]
    pub content: String,
}

/// Error payload within a Coze event
#[derive(Debug, Clone, Deserialize)]
pub struct CozeErrorInformation {
    /// Error message
    #[serde(default)]
    pub err_msg: String,
}
