//! Programmatic configuration builder for integration tests

use manifold_config::{AdapterConfig, AssistantConfig, Config, ImageGenConfig, SpaceConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with no upstreams configured
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Point the OpenAI-compatible catch-all adapter at a mock backend
    pub fn with_openai(mut self, base_url: &str) -> Self {
        self.config.adapters.openai = Some(AdapterConfig {
            api_key: Some(SecretString::from("sk-test")),
            base_url: Some(base_url.parse().expect("valid URL")),
        });
        self
    }

    /// Point the Google adapter at a mock backend
    pub fn with_google(mut self, base_url: &str) -> Self {
        self.config.adapters.google = Some(AdapterConfig {
            api_key: Some(SecretString::from("AIza-test")),
            base_url: Some(base_url.parse().expect("valid URL")),
        });
        self
    }

    /// Point the built-in assistant backend at a mock backend
    pub fn with_assistant(mut self, base_url: &str) -> Self {
        self.config.assistant = Some(AssistantConfig {
            model: "gpt-3.5-turbo".to_owned(),
            base_url: base_url.parse().expect("valid URL"),
            api_key: None,
        });
        self
    }

    /// Add the sd image space pointed at a mock backend
    pub fn with_sd_space(mut self, base_url: &str) -> Self {
        let imagegen = self.config.imagegen.get_or_insert_with(ImageGenConfig::default);
        imagegen.sd = Some(SpaceConfig {
            base_url: base_url.parse().expect("valid URL"),
            api_key: None,
        });
        self
    }

    /// Set the upscale endpoint invoked for high-definition output
    pub fn with_magnify(mut self, url: &str) -> Self {
        let imagegen = self.config.imagegen.get_or_insert_with(ImageGenConfig::default);
        imagegen.magnify_url = Some(url.parse().expect("valid URL"));
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
