//! Tool-call emulation over plain-text completion
//!
//! Providers without a native function-calling API are asked, in text, to
//! recommend a tool by id using a fixed `toolId = <id>` marker. When the
//! reply carries a known marker the tool is executed through an external
//! collaborator and the conversation is replayed with the result injected
//! as a `function`-role message; otherwise the raw reply passes through and
//! the caller stays on the non-emulated path.

use std::future::Future;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::LlmError;
use crate::normalize::merge_conversation;
use crate::types::{ChatMessage, Role, ToolDefinition};

/// External collaborator that actually runs a selected tool
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute the tool and return its textual result
    async fn execute(&self, tool: &ToolDefinition) -> Result<String, LlmError>;
}

/// Outcome of one emulation round-trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emulation {
    /// A tool was selected and executed; `reply` is the final answer
    Handled {
        /// Second round-trip reply, with the tool result in context
        reply: String,
    },
    /// No tool was selected; `reply` is the untouched first reply
    ///
    /// An empty reply means the round-trip was cancelled before producing
    /// one; either way the caller uses the non-emulated response path.
    Passthrough {
        /// Raw first reply, unmodified
        reply: String,
    },
}

/// Marker the model is asked to emit when recommending a tool
///
/// Tool ids are matched as whole tokens rather than a fixed-width slice,
/// since id length is not guaranteed by the generation scheme.
fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"toolId\s*=\s*([A-Za-z0-9_-]+)").expect("must be valid regex"))
}

/// Render the first-round instruction prompt
fn render_instruction(messages: &[ChatMessage], tools: &[ToolDefinition]) -> String {
    let mut listing = String::new();
    for tool in tools {
        listing.push_str(&format!(
            "* toolId = {}, name: {}, description: {}\n",
            tool.marker_id(),
            tool.name,
            tool.description.as_deref().unwrap_or_default(),
        ));
    }

    format!(
        "You have access to the following built-in tools:\n{listing}\n\
         If exactly one of them is suited to the latest request, answer with \
         the single line `toolId = XXXXX` (the tool's id) and nothing else. \
         If none of them applies, answer the request normally.\n\n{}",
        merge_conversation(messages)
    )
}

/// Run the tool-call emulation protocol
///
/// `invoke` performs one plain-text completion against the underlying
/// provider. Returns [`Emulation::Handled`] after a successful two-round
/// exchange, [`Emulation::Passthrough`] when no tool was selected. The
/// `ToolCallCancelled` control signal from `invoke` is folded into an empty
/// passthrough rather than an error.
pub async fn complete_tool_calls<F, Fut>(
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
    executor: &dyn ToolExecutor,
    invoke: F,
) -> Result<Emulation, LlmError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String, LlmError>>,
{
    if tools.is_empty() {
        return Ok(Emulation::Passthrough { reply: String::new() });
    }

    let reply = match invoke(render_instruction(messages, tools)).await {
        Ok(reply) => reply,
        Err(e) if e.is_tool_cancel() => return Ok(Emulation::Passthrough { reply: String::new() }),
        Err(e) => return Err(e),
    };

    let Some(tool) = recommended_tool(&reply, tools) else {
        return Ok(Emulation::Passthrough { reply });
    };

    tracing::info!(tool = %tool.name, "tool recommendation matched, executing");
    let result = executor.execute(tool).await?;

    let mut follow_up = messages.to_vec();
    let stripped = strip_marker(&reply);
    if !stripped.is_empty() {
        follow_up.push(ChatMessage::new(Role::Assistant, stripped));
    }
    follow_up.push(ChatMessage::function_result(tool.name.clone(), result));

    let reply = match invoke(merge_conversation(&follow_up)).await {
        Ok(reply) => reply,
        Err(e) if e.is_tool_cancel() => return Ok(Emulation::Passthrough { reply: String::new() }),
        Err(e) => return Err(e),
    };

    Ok(Emulation::Handled { reply })
}

/// Find the tool named by a recommendation marker in the reply, if any
fn recommended_tool<'a>(reply: &str, tools: &'a [ToolDefinition]) -> Option<&'a ToolDefinition> {
    let captures = marker_re().captures(reply)?;
    let id = captures.get(1)?.as_str();
    tools.iter().find(|tool| tool.marker_id() == id)
}

/// Strip every recommendation marker from a reply
pub fn strip_marker(reply: &str) -> String {
    marker_re().replace_all(reply, "").trim().to_owned()
}
