//! Coze bot adapter
//!
//! Converses with a configured bot. In notebook mode only the first system
//! message content is sent as the query; otherwise the merged conversation
//! is.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use manifold_config::CozeConfig;
use manifold_core::RequestContext;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Adapter, RouteHints, http_client, shape_stream, upstream_error};
use crate::error::LlmError;
use crate::normalize::merge_conversation;
use crate::protocol::coze::{CozeChunk, CozeRequest};
use crate::types::{ChatMessage, CompletionRequest, EventStream, Role, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://www.coze.com/api/conversation";

/// Model name this adapter answers to
const MODEL: &str = "coze";

/// Coze bot adapter
pub struct CozeAdapter {
    base_url: Url,
    api_key: Option<SecretString>,
    bot_id: String,
    notebook: bool,
}

impl CozeAdapter {
    /// Create from adapter configuration
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never
    /// happen).
    pub fn new(config: &CozeConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Self {
            base_url,
            api_key: config.api_key.clone(),
            bot_id: config.bot_id.clone().unwrap_or_default(),
            notebook: config.notebook,
        }
    }

    fn resolve_api_key(&self, context: &RequestContext) -> Result<String, LlmError> {
        context
            .credential_str()
            .map(ToOwned::to_owned)
            .or_else(|| self.api_key.as_ref().map(|k| k.expose_secret().to_owned()))
            .ok_or_else(|| LlmError::InvalidRequest("missing Coze token".to_owned()))
    }

    /// Query text for one request, honoring notebook mode
    fn build_query(&self, messages: &[ChatMessage]) -> String {
        if self.notebook {
            if let Some(first) = messages.iter().find(|m| m.role == Role::System) {
                return first.content.clone();
            }
        }
        merge_conversation(messages)
    }
}

#[async_trait]
impl Adapter for CozeAdapter {
    fn name(&self) -> &'static str {
        "coze"
    }

    fn matches(&self, _context: &RequestContext, model: &str) -> Option<RouteHints> {
        (model == MODEL).then(RouteHints::default)
    }

    async fn complete(
        &self,
        context: &RequestContext,
        request: &CompletionRequest,
        _hints: RouteHints,
    ) -> Result<EventStream, LlmError> {
        let api_key = self.resolve_api_key(context)?;

        let wire = CozeRequest {
            bot_id: self.bot_id.clone(),
            query: self.build_query(&request.messages),
            stream: true,
        };

        let response = http_client(context)?
            .post(self.base_url.clone())
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
                Ok(event) => match serde_json::from_str::<CozeChunk>(&event.data) {
                    Ok(chunk) => match chunk.event.as_str() {
                        "message" => chunk
                            .message
                            .filter(|message| message.message_type == "answer" && !message.content.is_empty())
                            .map(|message| Ok(StreamEvent::Content(message.content))),
                        "error" => Some(Ok(StreamEvent::Error(
                            chunk.error_information.map(|e| e.err_msg).unwrap_or_default(),
                        ))),
                        _ => None,
                    },
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unparseable bot event");
                        None
                    }
                },
                Err(e) => Some(Err(LlmError::Transport(e.to_string()))),
            }
        });

        Ok(shape_stream(events, request.stream))
    }
}
