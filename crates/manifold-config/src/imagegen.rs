use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Image generation configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageGenConfig {
    /// Stable Diffusion 1.x space
    #[serde(default)]
    pub sd: Option<SpaceConfig>,
    /// SDXL space
    #[serde(default)]
    pub xl: Option<SpaceConfig>,
    /// Google imagen space
    #[serde(default)]
    pub google: Option<SpaceConfig>,
    /// Upscale endpoint invoked for high-definition output
    #[serde(default)]
    pub magnify_url: Option<Url>,
}

/// One image backend space
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceConfig {
    /// Space endpoint URL
    pub base_url: Url,
    /// API key for the space, if it requires one
    #[serde(default)]
    pub api_key: Option<SecretString>,
}
