//! Cohere chat adapter
//!
//! Streams line-delimited JSON rather than SSE. Role labels are always
//! appended to the stop sequences so the model does not impersonate the
//! other side of the merged conversation.

use async_trait::async_trait;
use futures_util::StreamExt;
use manifold_config::AdapterConfig;
use manifold_core::RequestContext;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Adapter, RouteHints, http_client, lines_stream, shape_stream, upstream_error};
use crate::error::LlmError;
use crate::normalize::merge_conversation;
use crate::protocol::cohere::{CohereChunk, CohereRequest};
use crate::types::{CompletionRequest, EventStream, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://api.cohere.ai";

/// Stop sequences guarding the merged-conversation role labels
const ROLE_STOPS: [&str; 3] = ["user:", "assistant:", "system:"];

/// Cohere chat adapter
pub struct CohereAdapter {
    base_url: Url,
    api_key: Option<SecretString>,
}

impl CohereAdapter {
    /// Create from adapter configuration
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never
    /// happen).
    pub fn new(config: &AdapterConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Self {
            base_url,
            api_key: config.api_key.clone(),
        }
    }

    fn resolve_api_key(&self, context: &RequestContext) -> Result<String, LlmError> {
        context
            .credential_str()
            .map(ToOwned::to_owned)
            .or_else(|| self.api_key.as_ref().map(|k| k.expose_secret().to_owned()))
            .ok_or_else(|| LlmError::InvalidRequest("missing Cohere API key".to_owned()))
    }
}

#[async_trait]
impl Adapter for CohereAdapter {
    fn name(&self) -> &'static str {
        "cohere"
    }

    fn matches(&self, _context: &RequestContext, model: &str) -> Option<RouteHints> {
        model.starts_with("command").then(RouteHints::default)
    }

    async fn complete(
        &self,
        context: &RequestContext,
        request: &CompletionRequest,
        _hints: RouteHints,
    ) -> Result<EventStream, LlmError> {
        let api_key = self.resolve_api_key(context)?;

        let mut stop_sequences: Vec<String> = ROLE_STOPS.iter().map(|s| (*s).to_owned()).collect();
        if let Some(stop) = &request.params.stop {
            stop_sequences.extend(stop.iter().cloned());
        }

        let wire = CohereRequest {
            model: request.model.clone(),
            message: merge_conversation(&request.messages),
            temperature: request.params.temperature,
            k: request.params.top_k,
            max_tokens: request.params.max_tokens,
            stop_sequences,
            stream: true,
        };

        let base = self.base_url.as_str().trim_end_matches('/');
        let response = http_client(context)?
            .post(format!("{base}/v1/chat"))
            .bearer_auth(api_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(adapter = self.name(), error = %e, "upstream request failed");
                LlmError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let events = lines_stream(response.bytes_stream()).filter_map(|item| async move {
            match item {
                Ok(line) => {
                    if line.trim().is_empty() {
                        return None;
                    }
                    match serde_json::from_str::<CohereChunk>(&line) {
                        Ok(chunk) if chunk.event_type == "text-generation" => {
                            chunk.text.map(|text| Ok(StreamEvent::Content(text)))
                        }
                        Ok(_) => None,
                        Err(e) => {
                            tracing::debug!(error = %e, "skipping unparseable chat line");
                            None
                        }
                    }
                }
                Err(e) => Some(Err(e)),
            }
        });

        Ok(shape_stream(events, request.stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_command_model_family() {
        let adapter = CohereAdapter::new(&AdapterConfig::default());
        let context = RequestContext::empty();

        assert!(adapter.matches(&context, "command-r").is_some());
        assert!(adapter.matches(&context, "command-r-plus").is_some());
        assert!(adapter.matches(&context, "claude-2.1").is_none());
    }
}
