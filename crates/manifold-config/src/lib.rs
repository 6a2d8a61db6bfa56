//! Configuration for the Manifold gateway
//!
//! TOML-based, with `{{ env.VAR }}` expansion applied to the raw text
//! before deserialization so structs use plain `String`/`SecretString`.

#![allow(clippy::must_use_candidate)]

pub mod adapters;
mod env;
pub mod imagegen;
mod loader;
pub mod server;

use serde::Deserialize;

pub use adapters::{AdapterConfig, AdaptersConfig, AssistantConfig, CozeConfig};
pub use imagegen::{ImageGenConfig, SpaceConfig};
pub use server::ServerConfig;

/// Top-level Manifold configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream chat adapter configuration
    #[serde(default)]
    pub adapters: AdaptersConfig,
    /// Built-in assistant backend used for internal prompt tasks
    #[serde(default)]
    pub assistant: Option<AssistantConfig>,
    /// Image generation configuration
    #[serde(default)]
    pub imagegen: Option<ImageGenConfig>,
    /// Outbound proxy URL applied to upstream calls
    #[serde(default)]
    pub proxy: Option<String>,
}
