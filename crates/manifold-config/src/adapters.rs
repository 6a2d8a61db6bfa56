use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Upstream chat adapter configuration
///
/// An adapter participates in routing only when its section is present.
/// Registration order is fixed by the registry, not by this struct.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdaptersConfig {
    /// Claude text-completion upstream
    #[serde(default)]
    pub claude: Option<AdapterConfig>,
    /// Cohere chat upstream
    #[serde(default)]
    pub cohere: Option<AdapterConfig>,
    /// Coze bot upstream
    #[serde(default)]
    pub coze: Option<CozeConfig>,
    /// Google Generative Language upstream
    #[serde(default)]
    pub google: Option<AdapterConfig>,
    /// OpenAI-compatible catch-all upstream
    #[serde(default)]
    pub openai: Option<AdapterConfig>,
}

/// Settings shared by most upstream adapters
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    /// API key used when the client credential is not forwarded
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
}

/// Coze-specific settings
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CozeConfig {
    /// API key used when the client credential is not forwarded
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Bot identifier to converse with
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Notebook mode: send only the first system message content as the query
    #[serde(default)]
    pub notebook: bool,
}

/// Built-in assistant backend used for internal prompt tasks
///
/// Points at any OpenAI-compatible chat endpoint; the image pipeline uses it
/// to turn a free-form prompt into drawing tags.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Model name to request
    pub model: String,
    /// Chat endpoint base URL (e.g. `http://127.0.0.1:8080`)
    pub base_url: Url,
    /// Authorization token sent to the backend
    #[serde(default)]
    pub api_key: Option<SecretString>,
}
