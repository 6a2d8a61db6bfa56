//! OpenAI-compatible wire format
//!
//! Serves double duty: the gateway's inbound API surface deserializes these
//! types, and the catch-all passthrough adapter serializes them back out to
//! an OpenAI-style upstream.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::{ChatMessage, CompletionParams, CompletionRequest, GenerationRequest, Role, ToolDefinition};

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// -- Chat request --

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
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
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
}

impl ChatCompletionRequest {
    /// Validate the wire request into the internal representation
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` when a message carries a role
    /// outside the supported four.
    pub fn into_internal(self) -> Result<CompletionRequest, LlmError> {
        let messages = self
            .messages
            .into_iter()
            .enumerate()
            .map(|(index, message)| {
                Ok(ChatMessage {
                    role: Role::parse(&message.role, index)?,
                    content: message.content,
                    name: message.name,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        let tools = self
            .tools
            .into_iter()
            .map(|tool| ToolDefinition {
                id: tool.id,
                name: tool.function.name,
                description: tool.function.description,
                parameters: tool.function.parameters,
            })
            .collect();

        Ok(CompletionRequest {
            model: self.model,
            messages,
            params: CompletionParams {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                top_k: self.top_k,
                stop: self.stop,
            },
            tools,
            stream: self.stream,
        })
    }
}

/// Message as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Role string, validated against the four supported roles
    pub role: String,
    /// Message content
    #[serde(default)]
    pub content: String,
    /// Participant or tool name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        };
        Self {
            role: role.to_owned(),
            content: message.content.clone(),
            name: message.name.clone(),
        }
    }
}

/// Tool definition on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTool {
    /// Tool type, always "function"
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function specification
    pub function: WireFunction,
    /// Optional stable id used by the emulation marker protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Function specification within a tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunction {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// -- Chat response --

/// Non-streaming chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response identifier
    pub id: String,
    /// Object type, `chat.completion`
    pub object: String,
    /// Creation time (Unix seconds)
    pub created: u64,
    /// Model that served the request
    pub model: String,
    /// Response choices (always exactly one)
    pub choices: Vec<ChatChoice>,
}

/// One response choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Choice index
    pub index: u32,
    /// Response message
    pub message: ChoiceMessage,
    /// Why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Message within a response choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    /// Always `assistant`
    pub role: String,
    /// Text content, absent for tool-call responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

/// Tool call within a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    /// Call identifier
    pub id: String,
    /// Always "function"
    #[serde(rename = "type")]
    pub call_type: String,
    /// Called function
    pub function: WireFunctionCall,
}

/// Function name and arguments within a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

impl ChatCompletionResponse {
    /// Plain content response
    pub fn content(model: &str, content: String) -> Self {
        let created = unix_now();
        Self {
            id: format!("chatcmpl-{created}"),
            object: "chat.completion".to_owned(),
            created,
            model: model.to_owned(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChoiceMessage {
                    role: "assistant".to_owned(),
                    content: Some(content),
                    tool_calls: None,
                },
                finish_reason: Some("stop".to_owned()),
            }],
        }
    }

    /// Tool-call response
    pub fn tool_calls(model: &str, name: &str, arguments: &str) -> Self {
        let created = unix_now();
        Self {
            id: format!("chatcmpl-{created}"),
            object: "chat.completion".to_owned(),
            created,
            model: model.to_owned(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChoiceMessage {
                    role: "assistant".to_owned(),
                    content: None,
                    tool_calls: Some(vec![WireToolCall {
                        id: format!("call_{name}"),
                        call_type: "function".to_owned(),
                        function: WireFunctionCall {
                            name: name.to_owned(),
                            arguments: arguments.to_owned(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_owned()),
            }],
        }
    }
}

// -- Streaming chunks --

/// Streaming chat completion chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Response identifier
    pub id: String,
    /// Object type, `chat.completion.chunk`
    pub object: String,
    /// Creation time (Unix seconds)
    pub created: u64,
    /// Model that served the request
    pub model: String,
    /// Chunk choices
    pub choices: Vec<ChunkChoice>,
}

/// One streaming choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Incremental delta
    pub delta: ChunkDelta,
    /// Why generation stopped, on the final chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Incremental update within a streaming chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, present on the first chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Incremental text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Incremental tool call data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

impl ChatChunk {
    /// Content delta chunk
    pub fn content(model: &str, created: u64, delta: &str) -> Self {
        Self {
            id: format!("chatcmpl-{created}"),
            object: "chat.completion.chunk".to_owned(),
            created,
            model: model.to_owned(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: Some("assistant".to_owned()),
                    content: Some(delta.to_owned()),
                    tool_calls: None,
                },
                finish_reason: None,
            }],
        }
    }

    /// Tool-call delta chunk
    pub fn tool_calls(model: &str, created: u64, name: &str, arguments: &str) -> Self {
        Self {
            id: format!("chatcmpl-{created}"),
            object: "chat.completion.chunk".to_owned(),
            created,
            model: model.to_owned(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: Some("assistant".to_owned()),
                    content: None,
                    tool_calls: Some(vec![WireToolCall {
                        id: format!("call_{name}"),
                        call_type: "function".to_owned(),
                        function: WireFunctionCall {
                            name: name.to_owned(),
                            arguments: arguments.to_owned(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_owned()),
            }],
        }
    }
}

// -- Image generation --

/// Image generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    /// Model identifier
    pub model: String,
    /// Text description of the desired image
    pub prompt: String,
    /// Requested size
    #[serde(default)]
    pub size: String,
    /// Requested quality
    #[serde(default)]
    pub quality: String,
    /// Requested style
    #[serde(default)]
    pub style: String,
}

impl From<ImageGenerationRequest> for GenerationRequest {
    fn from(wire: ImageGenerationRequest) -> Self {
        Self {
            model: wire.model,
            prompt: wire.prompt,
            size: wire.size,
            quality: wire.quality,
            style: wire.style,
        }
    }
}

/// Image generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    /// Creation time (Unix seconds)
    pub created: u64,
    /// Generated image entries
    pub data: Vec<ImageData>,
    /// Styles the selected space accepts
    pub styles: Vec<String>,
    /// Samplers the selected space accepts
    pub samples: Vec<String>,
    /// Tag prompt the space was given
    pub prompt: String,
    /// Style actually used
    #[serde(rename = "currStyle")]
    pub curr_style: String,
    /// Sampler actually used
    #[serde(rename = "currSamples")]
    pub curr_samples: String,
}

impl From<crate::types::ImageGeneration> for ImageGenerationResponse {
    fn from(generation: crate::types::ImageGeneration) -> Self {
        Self {
            created: unix_now(),
            data: vec![ImageData { url: generation.url }],
            styles: generation.styles,
            samples: generation.samplers,
            prompt: generation.prompt,
            curr_style: generation.style,
            curr_samples: generation.sampler,
        }
    }
}

/// Single image entry in the response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// URL of the generated image
    pub url: String,
}

// -- Upstream passthrough response shapes --

/// Response body of an OpenAI-style upstream, for internal calls
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChatResponse {
    /// Response choices
    #[serde(default)]
    pub choices: Vec<UpstreamChoice>,
    /// Error payload, present on failures
    #[serde(default)]
    pub error: Option<UpstreamError>,
}

/// Choice within an upstream response
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChoice {
    /// Response message
    pub message: UpstreamChoiceMessage,
}

/// Message within an upstream choice
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChoiceMessage {
    /// Text content
    #[serde(default)]
    pub content: String,
}

/// Error payload of an OpenAI-style upstream
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamError {
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Streaming chunk of an OpenAI-style upstream
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChunk {
    /// Chunk choices
    #[serde(default)]
    pub choices: Vec<UpstreamChunkChoice>,
}

/// Choice within an upstream chunk
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChunkChoice {
    /// Incremental delta
    #[serde(default)]
    pub delta: UpstreamChunkDelta,
}

/// Delta within an upstream chunk choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamChunkDelta {
    /// Incremental text content
    #[serde(default)]
    pub content: Option<String>,
}
