//! Google Generative Language API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Google `streamGenerateContent` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleRequest {
    /// Conversation contents
    pub contents: Vec<GoogleContent>,
    /// Generation configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GoogleGenerationConfig>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GoogleTool>>,
}

/// Google content object containing role and parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleContent {
    /// Role ("user" or "model")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    pub parts: Vec<GooglePart>,
}

/// Individual part within a Google content object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GooglePart {
    /// Text content
    Text(String),
}

/// Generation configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGenerationConfig {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Top-k sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Maximum output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Google tool definition wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTool {
    /// Function declarations
    pub function_declarations: Vec<GoogleFunctionDeclaration>,
}

/// Google function declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleFunctionDeclaration {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// -- Streaming response types --
//
// The raw `streamGenerateContent` body is one JSON array of response
// objects, delivered incrementally. Text deltas are scalped line by line;
// only function-call payloads go through this typed decode.

/// One response object within the streamed array
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleStreamEnvelope {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<GoogleCandidate>,
}

/// Generated candidate
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCandidate {
    /// Generated content
    pub content: GoogleCandidateContent,
}

/// Candidate content parts
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCandidateContent {
    /// Content parts
    #[serde(default)]
    pub parts: Vec<GoogleResponsePart>,
}

/// Part of a candidate response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleResponsePart {
    /// Text content
    #[serde(default)]
    pub text: Option<String>,
    /// Function call requested by the model
    #[serde(default)]
    pub function_call: Option<GoogleFunctionCall>,
}

/// Function call from the model
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleFunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON
    #[serde(default)]
    pub args: serde_json::Value,
}

// -- Error response --

/// Google error response
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorResponse {
    /// Error details
    pub error: GoogleErrorDetail,
}

/// Google error detail
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorDetail {
    /// HTTP status code
    #[serde(default)]
    pub code: u16,
    /// Error message
    pub message: String,
}
