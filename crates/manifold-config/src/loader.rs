use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded =
            crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no upstream is configured or an individual
    /// section is incomplete
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_has_upstreams()?;
        self.validate_imagegen()?;
        Ok(())
    }

    /// Ensure at least one upstream adapter or image space is configured
    fn validate_has_upstreams(&self) -> anyhow::Result<()> {
        let adapters = &self.adapters;
        let has_chat = adapters.claude.is_some()
            || adapters.cohere.is_some()
            || adapters.coze.is_some()
            || adapters.google.is_some()
            || adapters.openai.is_some();
        let has_image = self.imagegen.is_some();

        if !has_chat && !has_image {
            anyhow::bail!("at least one upstream must be configured (chat adapter or image space)");
        }

        Ok(())
    }

    /// Image generation needs the assistant backend for tag generation
    fn validate_imagegen(&self) -> anyhow::Result<()> {
        if self.imagegen.is_some() && self.assistant.is_none() {
            anyhow::bail!("imagegen requires the [assistant] backend for prompt tag generation");
        }

        Ok(())
    }
}
