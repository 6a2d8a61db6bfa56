//! Core adapter and response-shaping crate for Manifold
//!
//! Translates an OpenAI-style completion/image surface into calls against
//! heterogeneous upstream chat providers, normalizing their responses back
//! into OpenAI-compatible bodies and SSE streams. Routing is first-match-wins
//! over an ordered, immutable adapter registry; providers without a native
//! function-calling API get tool calls emulated through a text marker
//! protocol.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod emulate;
pub mod error;
pub mod normalize;
pub mod protocol;
pub mod provider;
pub mod reduce;
pub mod registry;
#[cfg(feature = "http")]
pub mod router;
pub mod types;

pub use error::LlmError;
pub use provider::{Adapter, RouteHints};
pub use registry::{AdapterRegistry, RouteBinding};
#[cfg(feature = "http")]
pub use router::{GatewayState, gateway_router};
pub use types::{ChatMessage, CompletionRequest, GenerationRequest, Role, StreamEvent};
