//! Axum route handlers for the OpenAI-compatible surface
//!
//! Validates inbound requests, dispatches them through the adapter
//! registry, and renders gateway events back out as JSON bodies or SSE
//! frames terminated by a literal `[DONE]` frame.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::{Stream, StreamExt, stream};
use manifold_core::{HttpError, RequestContext};

use crate::emulate::{Emulation, ToolExecutor, complete_tool_calls};
use crate::error::LlmError;
use crate::protocol::openai::{
    ChatChunk, ChatCompletionRequest, ChatCompletionResponse, ImageGenerationRequest, ImageGenerationResponse,
    unix_now,
};
use crate::provider::collect_text;
use crate::registry::{AdapterRegistry, RouteBinding};
use crate::types::{ChatMessage, CompletionRequest, Role, StreamEvent};

/// Shared state for the gateway route handlers
#[derive(Clone)]
pub struct GatewayState {
    registry: Arc<AdapterRegistry>,
    tool_executor: Option<Arc<dyn ToolExecutor>>,
}

impl GatewayState {
    /// Create gateway state over a built registry
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            tool_executor: None,
        }
    }

    /// Attach the external collaborator that runs emulated tool calls
    #[must_use]
    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = Some(executor);
        self
    }
}

/// Build the gateway router with all endpoints
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .route("/v1/images/generations", routing::post(image_generations))
        .with_state(state)
}

/// Handle `POST /v1/chat/completions`
async fn chat_completions(
    State(state): State<GatewayState>,
    axum::Extension(context): axum::Extension<RequestContext>,
    Json(wire): Json<ChatCompletionRequest>,
) -> Response {
    if wire.messages.is_empty() {
        return error_response(&LlmError::InvalidRequest("[] is too short - 'messages'".to_owned()));
    }

    let request = match wire.into_internal() {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let binding = match state.registry.find(&context, &request.model) {
        Ok(binding) => binding,
        Err(e) => return error_response(&e),
    };

    // emulate tool calls for adapters without a native function-call API
    if !request.tools.is_empty()
        && !binding.adapter.native_tools()
        && let Some(executor) = &state.tool_executor
    {
        match emulated_completion(&context, &request, &binding, executor.as_ref()).await {
            Ok(Some(reply)) => return text_response(&request, reply),
            Ok(None) => {}
            Err(e) => return error_response(&e),
        }
    }

    match binding.adapter.complete(&context, &request, binding.hints).await {
        Ok(events) => {
            if request.stream {
                sse_response(events, request.model).into_response()
            } else {
                aggregate_response(events, &request.model).await
            }
        }
        Err(e) => error_response(&e),
    }
}

/// Handle `POST /v1/images/generations`
async fn image_generations(
    State(state): State<GatewayState>,
    axum::Extension(context): axum::Extension<RequestContext>,
    Json(wire): Json<ImageGenerationRequest>,
) -> Response {
    tracing::info!(model = %wire.model, "generate images text: {}", wire.prompt);

    let binding = match state.registry.find(&context, &wire.model) {
        Ok(binding) => binding,
        Err(e) => return error_response(&e),
    };

    match binding.adapter.generate(&context, &wire.into(), binding.hints).await {
        Ok(generation) => Json(ImageGenerationResponse::from(generation)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Run one emulation round and decide what to answer
///
/// `Ok(Some(reply))` short-circuits with a final text answer; `Ok(None)`
/// falls back to the normal completion path.
async fn emulated_completion(
    context: &RequestContext,
    request: &CompletionRequest,
    binding: &RouteBinding,
    executor: &dyn ToolExecutor,
) -> Result<Option<String>, LlmError> {
    let adapter = Arc::clone(&binding.adapter);
    let hints = binding.hints;

    let invoke = |prompt: String| {
        let adapter = Arc::clone(&adapter);
        let inner = CompletionRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage::new(Role::System, prompt)],
            params: request.params.clone(),
            tools: Vec::new(),
            stream: false,
        };
        async move {
            let events = adapter.complete(context, &inner, hints).await?;
            collect_text(events).await
        }
    };

    match complete_tool_calls(&request.messages, &request.tools, executor, invoke).await? {
        Emulation::Handled { reply } => Ok(Some(reply)),
        Emulation::Passthrough { reply } if !reply.is_empty() => Ok(Some(reply)),
        Emulation::Passthrough { .. } => Ok(None),
    }
}

/// Answer with a fixed text, as a JSON body or a one-chunk SSE stream
fn text_response(request: &CompletionRequest, reply: String) -> Response {
    if request.stream {
        let events: Vec<Result<StreamEvent, LlmError>> = vec![Ok(StreamEvent::Content(reply)), Ok(StreamEvent::Done)];
        sse_response(Box::pin(stream::iter(events)), request.model.clone()).into_response()
    } else {
        Json(ChatCompletionResponse::content(&request.model, reply)).into_response()
    }
}

/// Collect a non-streaming event stream into one response body
async fn aggregate_response(mut events: crate::types::EventStream, model: &str) -> Response {
    while let Some(item) = events.next().await {
        match item {
            Ok(StreamEvent::Content(content)) => {
                return Json(ChatCompletionResponse::content(model, content)).into_response();
            }
            Ok(StreamEvent::ToolCall(call)) => {
                return Json(ChatCompletionResponse::tool_calls(model, &call.name, &call.arguments)).into_response();
            }
            Ok(StreamEvent::Error(payload)) => {
                return error_response(&LlmError::Upstream {
                    status: None,
                    message: payload,
                });
            }
            Ok(StreamEvent::Done) => break,
            Err(e) => return error_response(&e),
        }
    }

    error_response(&LlmError::Upstream {
        status: None,
        message: "upstream produced no response".to_owned(),
    })
}

/// Render an event stream as OpenAI-style SSE frames
fn sse_response(
    events: crate::types::EventStream,
    model: String,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let created = unix_now();

    let frames = events.map(move |item| match item {
        Ok(StreamEvent::Content(delta)) => {
            let chunk = ChatChunk::content(&model, created, &delta);
            Ok(Event::default().data(serde_json::to_string(&chunk).unwrap_or_default()))
        }
        Ok(StreamEvent::ToolCall(call)) => {
            let chunk = ChatChunk::tool_calls(&model, created, &call.name, &call.arguments);
            Ok(Event::default().data(serde_json::to_string(&chunk).unwrap_or_default()))
        }
        Ok(StreamEvent::Error(payload)) => {
            let body = serde_json::json!({
                "error": {
                    "message": payload,
                    "type": "upstream_error",
                }
            });
            Ok(Event::default().data(body.to_string()))
        }
        Ok(StreamEvent::Done) => Ok(Event::default().data("[DONE]")),
        Err(e) => {
            let body = serde_json::json!({
                "error": {
                    "message": e.client_message(),
                    "type": e.error_type(),
                }
            });
            Ok(Event::default().data(body.to_string()))
        }
    });

    Sse::new(frames).keep_alive(KeepAlive::default())
}

/// Render a domain error as an OpenAI-style JSON error body
fn error_response(error: &LlmError) -> Response {
    let status = error.status_code();
    let body = serde_json::json!({
        "error": {
            "message": error.client_message(),
            "type": error.error_type(),
            "code": serde_json::Value::Null,
        }
    });

    (status, Json(body)).into_response()
}
