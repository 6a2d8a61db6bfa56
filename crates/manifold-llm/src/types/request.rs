use serde::{Deserialize, Serialize};

use super::message::ChatMessage;
use super::tool::ToolDefinition;

/// Parameters controlling text generation
///
/// Each adapter maps the subset its upstream supports and ignores the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Top-k sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Internal canonical completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier as requested by the client
    pub model: String,
    /// Conversation messages, in order
    pub messages: Vec<ChatMessage>,
    /// Generation parameters
    #[serde(default)]
    pub params: CompletionParams,
    /// Tool definitions offered by the client
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

/// Internal canonical image generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier as requested by the client
    pub model: String,
    /// Free-form description of the desired image
    pub prompt: String,
    /// Requested size; `HD` or a `1792x*` value triggers the upscale step
    #[serde(default)]
    pub size: String,
    /// Requested quality, matched against the space's sampler list
    #[serde(default)]
    pub quality: String,
    /// Requested style, matched against the space's model list
    #[serde(default)]
    pub style: String,
}

/// Result of one image generation round-trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGeneration {
    /// URL of the generated (possibly upscaled) image
    pub url: String,
    /// Style the space actually used
    pub style: String,
    /// Sampler the space actually used
    pub sampler: String,
    /// Styles the space accepts
    pub styles: Vec<String>,
    /// Samplers the space accepts
    pub samplers: Vec<String>,
    /// Tag prompt sent to the space
    pub prompt: String,
}
