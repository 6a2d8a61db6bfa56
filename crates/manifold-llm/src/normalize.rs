//! Conversation merging for text-completion upstreams
//!
//! Several upstreams take a single prompt string rather than structured
//! turns. This module folds an ordered message list into that encoding:
//! consecutive same-role messages collapse into one labelled block, and
//! tool results are rewritten into an annotated text block first.

use crate::types::{ChatMessage, Role};

/// Provider vocabulary for a role
const fn provider_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "human",
        Role::Assistant => "assistant",
        Role::Function => "function",
    }
}

/// Capitalized block label for a mapped role
fn block_label(mapped: &str) -> String {
    let mut chars = mapped.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

/// Rewrite a tool result into its annotated text form
fn annotate_function_result(message: &ChatMessage) -> String {
    format!(
        "This is the result of a built-in tool ({})\n\n##\n{}\n##",
        message.name.as_deref().unwrap_or_default(),
        message.content
    )
}

/// Merge an ordered conversation into a single labelled prompt string
///
/// Consecutive messages with the same mapped role are joined by a blank
/// line under one `Role:` block; a role transition flushes the pending
/// block. An empty message list yields an empty string. The input is never
/// mutated, so repeated calls yield identical output.
pub fn merge_conversation(messages: &[ChatMessage]) -> String {
    let mut merged = String::new();
    let mut current: Option<&'static str> = None;
    let mut buffer: Vec<String> = Vec::new();

    let flush = |merged: &mut String, role: &str, buffer: &mut Vec<String>| {
        merged.push_str(&format!("{}:\n{}\n\n", block_label(role), buffer.join("\n\n")));
        buffer.clear();
    };

    for message in messages {
        let mapped = provider_role(message.role);
        let content = if message.role == Role::Function {
            annotate_function_result(message)
        } else {
            message.content.clone()
        };

        match current {
            Some(role) if role == mapped => buffer.push(content),
            Some(role) => {
                flush(&mut merged, role, &mut buffer);
                buffer.push(content);
                current = Some(mapped);
            }
            None => {
                buffer.push(content);
                current = Some(mapped);
            }
        }
    }

    if let Some(role) = current
        && !buffer.is_empty()
    {
        flush(&mut merged, role, &mut buffer);
    }

    merged
}
