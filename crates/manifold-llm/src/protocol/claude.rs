//! Claude text completion API wire format types

use serde::{Deserialize, Serialize};

/// Claude `/v1/complete` request
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeRequest {
    /// Upstream model identifier
    pub model: String,
    /// Merged conversation prompt
    pub prompt: String,
    /// Maximum tokens to sample
    pub max_tokens_to_sample: u32,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Stop sequences
    pub stop_sequences: Vec<String>,
    /// Always true; the gateway consumes the SSE stream either way
    pub stream: bool,
}

/// One SSE data payload of a Claude completion stream
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeChunk {
    /// Incremental completion text
    #[serde(default)]
    pub completion: Option<String>,
    /// Error payload, present on failures
    #[serde(default)]
    pub error: Option<ClaudeError>,
}

/// Claude error detail
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeError {
    /// Error message
    #[serde(default)]
    pub message: String,
}
