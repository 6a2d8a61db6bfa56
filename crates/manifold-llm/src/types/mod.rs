//! Internal canonical types for gateway request/response representation
//!
//! Provider-agnostic; every wire format converts to and from these.

pub mod message;
pub mod request;
pub mod stream;
pub mod tool;

pub use message::{ChatMessage, Role};
pub use request::{CompletionParams, CompletionRequest, GenerationRequest, ImageGeneration};
pub use stream::{EventStream, StreamEvent, ToolCallEvent};
pub use tool::ToolDefinition;
