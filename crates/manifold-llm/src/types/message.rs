use serde::{Deserialize, Serialize};

/// Role of a message participant
///
/// Inbound role strings outside these four are rejected at the wire
/// boundary, so code past that point never sees an unmapped role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Result of a built-in tool invocation
    Function,
}

impl Role {
    /// Parse a wire role string, naming the offending message on failure
    pub fn parse(role: &str, index: usize) -> Result<Self, crate::LlmError> {
        match role {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "function" => Ok(Self::Function),
            other => Err(crate::LlmError::InvalidRequest(format!(
                "'{other}' is not one of ['system', 'assistant', 'user', 'function'] - 'messages.{index}.role'"
            ))),
        }
    }
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: String,
    /// Participant name; for `function` messages, the tool that produced
    /// the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    /// Convenience constructor
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// A `function`-role message carrying a named tool result
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            content: content.into(),
            name: Some(name.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_four_roles() {
        assert_eq!(Role::parse("system", 0).unwrap(), Role::System);
        assert_eq!(Role::parse("user", 1).unwrap(), Role::User);
        assert_eq!(Role::parse("assistant", 2).unwrap(), Role::Assistant);
        assert_eq!(Role::parse("function", 3).unwrap(), Role::Function);
    }

    #[test]
    fn rejects_unknown_role_naming_the_message() {
        let err = Role::parse("tool", 2).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'tool'"));
        assert!(message.contains("messages.2.role"));
    }
}
