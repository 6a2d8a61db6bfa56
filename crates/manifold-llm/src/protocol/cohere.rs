//! Cohere chat API wire format types

use serde::{Deserialize, Serialize};

/// Cohere `/v1/chat` request
#[derive(Debug, Clone, Serialize)]
pub struct CohereRequest {
    /// Upstream model identifier
    pub model: String,
    /// Merged conversation message
    pub message: String,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Top-k sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<u32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences; role labels are always included
    pub stop_sequences: Vec<String>,
    /// Always true; the gateway consumes the line stream either way
    pub stream: bool,
}

/// One line of a Cohere streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct CohereChunk {
    /// Event discriminator (`text-generation`, `stream-end`, ...)
    #[serde(default)]
    pub event_type: String,
    /// Incremental text for `text-generation` events
    #[serde(default)]
    pub text: Option<String>,
}
