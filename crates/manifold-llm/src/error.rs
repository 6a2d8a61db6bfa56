use http::StatusCode;
use manifold_core::HttpError;
use thiserror::Error;

/// Errors that can occur while shaping a gateway request or response
#[derive(Debug, Error)]
pub enum LlmError {
    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No registered adapter matched the requested model
    #[error("model '{model}' is not yet supported")]
    ModelNotSupported { model: String },

    /// Upstream provider returned an explicit error payload
    #[error("upstream error: {message}")]
    Upstream {
        /// Upstream HTTP status, when derivable
        status: Option<u16>,
        message: String,
    },

    /// Network or stream failure while talking to the upstream
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream payload could not be decoded into the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// The matched adapter does not generate images
    #[error("adapter '{adapter}' does not support image generation")]
    GenerationUnsupported { adapter: &'static str },

    /// The matched adapter does not serve chat completions
    #[error("adapter '{adapter}' does not support chat completion")]
    CompletionUnsupported { adapter: &'static str },

    /// Control signal: the model declined to select a tool
    ///
    /// Not a failure. Callers fall back to the non-emulated response path.
    #[error("no tool selected")]
    ToolCallCancelled,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Whether this error is the tool-call cancellation control signal
    pub const fn is_tool_cancel(&self) -> bool {
        matches!(self, Self::ToolCallCancelled)
    }

    /// Build an `Upstream` error from a status code and response body
    ///
    /// Tries to pull a structured `{"error": {"message": ...}}` out of the
    /// body; falls back to the raw text.
    pub fn from_upstream_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(ToOwned::to_owned)
            })
            .unwrap_or_else(|| body.to_owned());

        Self::Upstream {
            status: Some(status),
            message,
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::ModelNotSupported { .. }
            | Self::GenerationUnsupported { .. }
            | Self::CompletionUnsupported { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Transport(_) | Self::Parse(_) => StatusCode::BAD_GATEWAY,
            Self::ToolCallCancelled | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_)
            | Self::ModelNotSupported { .. }
            | Self::GenerationUnsupported { .. }
            | Self::CompletionUnsupported { .. } => "invalid_request_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Transport(_) => "transport_error",
            Self::Parse(_) => "parse_error",
            Self::ToolCallCancelled | Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
