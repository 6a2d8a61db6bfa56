//! Claude text-completion adapter
//!
//! Speaks the completion-flavored API: the whole conversation is merged
//! into one labelled prompt and the reply arrives as SSE completion deltas.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use manifold_config::AdapterConfig;
use manifold_core::RequestContext;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Adapter, RouteHints, http_client, shape_stream, upstream_error};
use crate::error::LlmError;
use crate::normalize::merge_conversation;
use crate::protocol::claude::{ClaudeChunk, ClaudeRequest};
use crate::types::{CompletionRequest, EventStream, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-2.1";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Claude text-completion adapter
pub struct ClaudeAdapter {
    base_url: Url,
    api_key: Option<SecretString>,
}

impl ClaudeAdapter {
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
            .ok_or_else(|| LlmError::InvalidRequest("missing Claude API key".to_owned()))
    }
}

#[async_trait]
impl Adapter for ClaudeAdapter {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn matches(&self, _context: &RequestContext, model: &str) -> Option<RouteHints> {
        (model == "claude" || model.starts_with("claude-")).then(RouteHints::default)
    }

    async fn complete(
        &self,
        context: &RequestContext,
        request: &CompletionRequest,
        _hints: RouteHints,
    ) -> Result<EventStream, LlmError> {
        let api_key = self.resolve_api_key(context)?;

        // pin the upstream model only when the client asked for the bare alias
        let model = if request.model.starts_with("claude-") {
            request.model.clone()
        } else {
            DEFAULT_MODEL.to_owned()
        };

        let mut prompt = merge_conversation(&request.messages);
        prompt.push_str("Assistant:");

        let wire = ClaudeRequest {
            model,
            prompt,
            max_tokens_to_sample: request.params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.params.temperature,
            stop_sequences: request
                .params
                .stop
                .clone()
                .unwrap_or_else(|| vec!["\n\nHuman:".to_owned()]),
            stream: true,
        };

        let base = self.base_url.as_str().trim_end_matches('/');
        let response = http_client(context)?
            .post(format!("{base}/v1/complete"))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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
                Ok(event) => match serde_json::from_str::<ClaudeChunk>(&event.data) {
                    Ok(chunk) => {
                        if let Some(error) = chunk.error {
                            return Some(Ok(StreamEvent::Error(error.message)));
                        }
                        chunk
                            .completion
                            .filter(|completion| !completion.is_empty())
                            .map(|completion| Ok(StreamEvent::Content(completion)))
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unparseable completion chunk");
                        None
                    }
                },
                Err(e) => Some(Err(LlmError::Transport(e.to_string()))),
            }
        });

        Ok(shape_stream(events, request.stream))
    }
}
