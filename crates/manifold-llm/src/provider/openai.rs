//! OpenAI-compatible passthrough adapter
//!
//! The catch-all registered last: forwards the conversation unchanged to a
//! configured OpenAI-style backend and relays its SSE deltas.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use manifold_config::AdapterConfig;
use manifold_core::RequestContext;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Adapter, RouteHints, http_client, shape_stream, upstream_error};
use crate::error::LlmError;
use crate::protocol::openai::{ChatCompletionRequest, UpstreamChunk, WireMessage};
use crate::types::{CompletionRequest, EventStream, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible passthrough adapter
pub struct OpenAiAdapter {
    base_url: Url,
    api_key: Option<SecretString>,
}

impl OpenAiAdapter {
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
            .ok_or_else(|| LlmError::InvalidRequest("missing API key".to_owned()))
    }
}

#[async_trait]
impl Adapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn matches(&self, _context: &RequestContext, model: &str) -> Option<RouteHints> {
        model.starts_with("gpt-").then(RouteHints::default)
    }

    async fn complete(
        &self,
        context: &RequestContext,
        request: &CompletionRequest,
        _hints: RouteHints,
    ) -> Result<EventStream, LlmError> {
        let api_key = self.resolve_api_key(context)?;

        let wire = ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            stream: true,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            top_k: None,
            stop: request.params.stop.clone(),
            tools: Vec::new(),
        };

        let base = self.base_url.as_str().trim_end_matches('/');
        let response = http_client(context)?
            .post(format!("{base}/v1/chat/completions"))
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

        let events = response.bytes_stream().eventsource().filter_map(|item| async move {
            match item {
                Ok(event) => {
                    if event.data.trim() == "[DONE]" {
                        return None;
                    }
                    match serde_json::from_str::<UpstreamChunk>(&event.data) {
                        Ok(chunk) => chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content)
                            .filter(|content| !content.is_empty())
                            .map(|content| Ok(StreamEvent::Content(content))),
                        Err(e) => {
                            tracing::debug!(error = %e, "skipping unparseable upstream chunk");
                            None
                        }
                    }
                }
                Err(e) => Some(Err(LlmError::Transport(e.to_string()))),
            }
        });

        Ok(shape_stream(events, request.stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_gpt_model_family() {
        let adapter = OpenAiAdapter::new(&AdapterConfig::default());
        let context = RequestContext::empty();

        assert!(adapter.matches(&context, "gpt-3.5-turbo").is_some());
        assert!(adapter.matches(&context, "gpt-4o").is_some());
        assert!(adapter.matches(&context, "gemini").is_none());
    }
}
