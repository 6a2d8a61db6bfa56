use serde::{Deserialize, Serialize};

/// A tool the client offers for the model to call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Stable identifier used by the emulation marker protocol
    ///
    /// Optional on the wire; falls back to the function name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the function parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl ToolDefinition {
    /// Identifier the emulator asks the model to echo back
    pub fn marker_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}
