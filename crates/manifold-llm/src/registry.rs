//! Adapter registry and dispatch
//!
//! Holds the ordered adapter list, built once at startup and never mutated
//! afterwards. Routing is first-match-wins over registration order, which
//! makes the order itself part of the routing contract: the OpenAI
//! passthrough is registered last so its broad match cannot shadow the
//! specific adapters.

use std::sync::Arc;

use manifold_config::Config;
use manifold_core::RequestContext;

use crate::error::LlmError;
use crate::provider::{Adapter, RouteHints};

/// A matched adapter together with its routing hints
#[derive(Clone)]
pub struct RouteBinding {
    /// The adapter that claimed the request
    pub adapter: Arc<dyn Adapter>,
    /// Hints its match produced for the subsequent call
    pub hints: RouteHints,
}

impl std::fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBinding")
            .field("adapter", &self.adapter.name())
            .field("hints", &self.hints)
            .finish()
    }
}

/// Immutable, ordered adapter registry
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Build a registry from an explicit adapter list
    ///
    /// Order is significant: dispatch selects the first adapter whose
    /// match succeeds.
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Self { adapters }
    }

    /// Build the registry from configuration, in canonical order
    pub fn from_config(config: &Config) -> Self {
        let mut adapters: Vec<Arc<dyn Adapter>> = Vec::new();

        if let Some(claude) = &config.adapters.claude {
            adapters.push(Arc::new(crate::provider::claude::ClaudeAdapter::new(claude)));
        }
        if let Some(cohere) = &config.adapters.cohere {
            adapters.push(Arc::new(crate::provider::cohere::CohereAdapter::new(cohere)));
        }
        if let Some(coze) = &config.adapters.coze {
            adapters.push(Arc::new(crate::provider::coze::CozeAdapter::new(coze)));
        }
        if let Some(google) = &config.adapters.google {
            adapters.push(Arc::new(crate::provider::google::GoogleAdapter::new(google)));
        }
        if let (Some(imagegen), Some(assistant)) = (&config.imagegen, &config.assistant) {
            adapters.push(Arc::new(crate::provider::prodia::ProdiaAdapter::new(imagegen, assistant)));
        }
        if let Some(openai) = &config.adapters.openai {
            adapters.push(Arc::new(crate::provider::openai::OpenAiAdapter::new(openai)));
        }

        Self::new(adapters)
    }

    /// Find the first adapter that serves `model` for this request
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ModelNotSupported` when no adapter matches.
    pub fn find(&self, context: &RequestContext, model: &str) -> Result<RouteBinding, LlmError> {
        for adapter in &self.adapters {
            if let Some(hints) = adapter.matches(context, model) {
                tracing::debug!(adapter = adapter.name(), model, "adapter matched");
                return Ok(RouteBinding {
                    adapter: Arc::clone(adapter),
                    hints,
                });
            }
        }

        Err(LlmError::ModelNotSupported {
            model: model.to_owned(),
        })
    }

    /// Registered adapter names, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|adapter| adapter.name()).collect()
    }
}
