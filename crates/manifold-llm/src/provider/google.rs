//! Google Generative Language adapter
//!
//! The one upstream with a native function-calling API. Its raw
//! `streamGenerateContent` body is consumed by the line reducer, which also
//! synthesizes the `ToolCall` event when the model answers with a function
//! call instead of text.

use async_trait::async_trait;
use manifold_config::AdapterConfig;
use manifold_core::RequestContext;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Adapter, RouteHints, http_client, upstream_error};
use crate::error::LlmError;
use crate::normalize::merge_conversation;
use crate::protocol::google::{
    GoogleContent, GoogleFunctionDeclaration, GoogleGenerationConfig, GooglePart, GoogleRequest, GoogleTool,
};
use crate::reduce::reduce_stream;
use crate::types::{CompletionRequest, EventStream};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model name this adapter answers to
const MODEL: &str = "gemini";

/// Model identifier sent upstream
const UPSTREAM_MODEL: &str = "gemini-pro";

/// Google Generative Language adapter
pub struct GoogleAdapter {
    base_url: Url,
    api_key: Option<SecretString>,
}

impl GoogleAdapter {
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

    /// API key from the client credential, falling back to configuration
    fn resolve_api_key(&self, context: &RequestContext) -> Result<String, LlmError> {
        context
            .credential_str()
            .map(ToOwned::to_owned)
            .or_else(|| self.api_key.as_ref().map(|k| k.expose_secret().to_owned()))
            .ok_or_else(|| LlmError::InvalidRequest("missing Google API key".to_owned()))
    }

    /// `streamGenerateContent` endpoint URL
    fn stream_url(&self, api_key: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/v1beta/models/{UPSTREAM_MODEL}:streamGenerateContent?key={api_key}")
    }
}

#[async_trait]
impl Adapter for GoogleAdapter {
    fn name(&self) -> &'static str {
        "google"
    }

    fn matches(&self, _context: &RequestContext, model: &str) -> Option<RouteHints> {
        (model == MODEL).then(RouteHints::default)
    }

    fn native_tools(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        context: &RequestContext,
        request: &CompletionRequest,
        _hints: RouteHints,
    ) -> Result<EventStream, LlmError> {
        let api_key = self.resolve_api_key(context)?;
        let prompt = merge_conversation(&request.messages);

        let wire = GoogleRequest {
            contents: vec![GoogleContent {
                role: Some("user".to_owned()),
                parts: vec![GooglePart::Text(prompt)],
            }],
            generation_config: Some(GoogleGenerationConfig {
                temperature: request.params.temperature,
                top_k: request.params.top_k,
                max_output_tokens: request.params.max_tokens,
                stop_sequences: request.params.stop.clone(),
            }),
            tools: (!request.tools.is_empty()).then(|| {
                vec![GoogleTool {
                    // upstream function names may not contain a hyphen
                    function_declarations: request
                        .tools
                        .iter()
                        .map(|tool| GoogleFunctionDeclaration {
                            name: tool.name.replacen('-', "_", 1),
                            description: tool.description.clone(),
                            parameters: tool.parameters.clone(),
                        })
                        .collect(),
                }]
            }),
        };

        let response = http_client(context)?
            .post(self.stream_url(&api_key))
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

        Ok(reduce_stream(response.bytes_stream(), request.stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_gemini_model() {
        let adapter = GoogleAdapter::new(&AdapterConfig::default());
        let context = RequestContext::empty();

        assert!(adapter.matches(&context, "gemini").is_some());
        assert!(adapter.matches(&context, "gemini-pro").is_none());
        assert!(adapter.matches(&context, "gpt-4").is_none());
    }

    #[test]
    fn stream_url_carries_key_and_model() {
        let adapter = GoogleAdapter::new(&AdapterConfig::default());
        let url = adapter.stream_url("AIza-test");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:streamGenerateContent?key=AIza-test"
        );
    }

    #[test]
    fn credential_beats_configured_key() {
        let config = AdapterConfig {
            api_key: Some(SecretString::from("config-key")),
            base_url: None,
        };
        let adapter = GoogleAdapter::new(&config);

        let from_credential = adapter.resolve_api_key(&RequestContext::with_credential("client-key")).unwrap();
        assert_eq!(from_credential, "client-key");

        let from_config = adapter.resolve_api_key(&RequestContext::empty()).unwrap();
        assert_eq!(from_config, "config-key");
    }
}
