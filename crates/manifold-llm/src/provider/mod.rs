//! Adapter trait and implementations for upstream services
//!
//! One adapter per upstream. Adapters are constructed once at startup,
//! registered in a fixed order, and hold no per-request state; everything a
//! request needs travels through [`RequestContext`] and [`RouteHints`].

pub mod claude;
pub mod cohere;
pub mod coze;
pub mod google;
pub mod openai;
pub mod prodia;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use manifold_core::RequestContext;

use crate::error::LlmError;
use crate::types::{CompletionRequest, EventStream, GenerationRequest, ImageGeneration, StreamEvent};

/// Backend space for image generation, selected by credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceKind {
    /// Stable Diffusion 1.x
    Sd,
    /// SDXL
    Xl,
    /// Google imagen
    Google,
}

/// Routing hints produced by a successful match
///
/// Replaces the source pattern of stashing provider-specific values into a
/// mutable request context: the match step returns what later steps need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteHints {
    /// Image space selected by the credential token
    pub space: Option<SpaceKind>,
}

/// Trait implemented by each upstream adapter
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Adapter name, used in logs and errors
    fn name(&self) -> &'static str;

    /// Capability check: does this adapter serve `model` for this request?
    ///
    /// Pure with respect to adapter and global state. Routing hints for the
    /// subsequent call are returned, never stored.
    fn matches(&self, context: &RequestContext, model: &str) -> Option<RouteHints>;

    /// Whether the upstream has a native function-calling API
    ///
    /// Adapters without one get tool calls emulated by the caller.
    fn native_tools(&self) -> bool {
        false
    }

    /// Serve a chat completion as a gateway event stream
    async fn complete(
        &self,
        context: &RequestContext,
        request: &CompletionRequest,
        hints: RouteHints,
    ) -> Result<EventStream, LlmError> {
        let _ = (context, request, hints);
        Err(LlmError::CompletionUnsupported { adapter: self.name() })
    }

    /// Generate an image
    async fn generate(
        &self,
        context: &RequestContext,
        request: &GenerationRequest,
        hints: RouteHints,
    ) -> Result<ImageGeneration, LlmError> {
        let _ = (context, request, hints);
        Err(LlmError::GenerationUnsupported { adapter: self.name() })
    }
}

/// Build a reqwest client honoring the request's proxy setting
pub(crate) fn http_client(context: &RequestContext) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();

    if let Some(proxy) = &context.proxy {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| LlmError::InvalidRequest(format!("invalid proxy: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| LlmError::Internal(anyhow::anyhow!("failed to build http client: {e}")))
}

/// Read a non-2xx response into an `Upstream` error
pub(crate) async fn upstream_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LlmError::from_upstream_body(status, &body)
}

/// Split an upstream byte stream into lines
///
/// Used by upstreams that speak line-delimited JSON rather than SSE.
pub(crate) fn lines_stream<S, E>(bytes: S) -> impl Stream<Item = Result<String, LlmError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display,
{
    bytes
        .map(Some)
        .chain(stream::once(async { None }))
        .scan(Vec::<u8>::new(), |pending, item| {
            let out: Vec<Result<String, LlmError>> = match item {
                Some(Ok(chunk)) => {
                    let mut lines = Vec::new();
                    for byte in &chunk {
                        if *byte == b'\n' {
                            let line = String::from_utf8_lossy(pending).into_owned();
                            pending.clear();
                            lines.push(Ok(line));
                        } else {
                            pending.push(*byte);
                        }
                    }
                    lines
                }
                Some(Err(e)) => vec![Err(LlmError::Transport(e.to_string()))],
                None => {
                    if pending.is_empty() {
                        Vec::new()
                    } else {
                        let line = String::from_utf8_lossy(pending).into_owned();
                        pending.clear();
                        vec![Ok(line)]
                    }
                }
            };
            futures_util::future::ready(Some(out))
        })
        .map(stream::iter)
        .flatten()
}

/// Shape a raw event stream into the gateway's terminal-event contract
///
/// Streaming mode passes events through and appends the `Done` sentinel;
/// non-streaming mode folds all content into one aggregated `Content`
/// event. A terminal `Error` or `ToolCall` suppresses everything after it.
pub(crate) fn shape_stream<S>(inner: S, streaming: bool) -> EventStream
where
    S: Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static,
{
    struct Shape {
        streaming: bool,
        aggregated: String,
        terminated: bool,
    }

    let items = inner
        .map(Some)
        .chain(stream::once(async { None }))
        .scan(
            Shape {
                streaming,
                aggregated: String::new(),
                terminated: false,
            },
            |shape, item| {
                let out: Vec<Result<StreamEvent, LlmError>> = match item {
                    _ if shape.terminated => Vec::new(),
                    Some(Ok(StreamEvent::Content(text))) => {
                        if shape.streaming {
                            vec![Ok(StreamEvent::Content(text))]
                        } else {
                            shape.aggregated.push_str(&text);
                            Vec::new()
                        }
                    }
                    Some(Ok(event @ (StreamEvent::ToolCall(_) | StreamEvent::Error(_)))) => {
                        shape.terminated = true;
                        vec![Ok(event)]
                    }
                    // an upstream Done is replaced by the shaped terminal
                    Some(Ok(StreamEvent::Done)) => Vec::new(),
                    Some(Err(e)) => {
                        shape.terminated = true;
                        vec![Err(e)]
                    }
                    None => {
                        if shape.streaming {
                            vec![Ok(StreamEvent::Done)]
                        } else {
                            vec![Ok(StreamEvent::Content(std::mem::take(&mut shape.aggregated)))]
                        }
                    }
                };
                futures_util::future::ready(Some(out))
            },
        )
        .map(stream::iter)
        .flatten();

    Box::pin(items)
}

/// Collect an event stream into its full text, for internal round-trips
///
/// Upstream error events become `Upstream` errors; a tool call in a plain
/// text exchange is unexpected and treated the same way.
pub(crate) async fn collect_text(mut events: EventStream) -> Result<String, LlmError> {
    let mut text = String::new();

    while let Some(item) = events.next().await {
        match item? {
            StreamEvent::Content(chunk) => text.push_str(&chunk),
            StreamEvent::Error(payload) => {
                return Err(LlmError::Upstream {
                    status: None,
                    message: payload,
                });
            }
            StreamEvent::ToolCall(call) => {
                return Err(LlmError::Upstream {
                    status: None,
                    message: format!("unexpected function call '{}' in text exchange", call.name),
                });
            }
            StreamEvent::Done => break,
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn content(text: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::Content(text.to_owned()))
    }

    #[tokio::test]
    async fn shape_streaming_appends_done() {
        let inner = stream::iter(vec![content("a"), content("b")]);
        let events: Vec<_> = shape_stream(inner, true).collect().await;

        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("a".to_owned()),
                StreamEvent::Content("b".to_owned()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn shape_non_streaming_aggregates() {
        let inner = stream::iter(vec![content("a"), content("b")]);
        let events: Vec<_> = shape_stream(inner, false).collect().await;

        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events, vec![StreamEvent::Content("ab".to_owned())]);
    }

    #[tokio::test]
    async fn shape_stops_after_error_event() {
        let inner = stream::iter(vec![
            content("a"),
            Ok(StreamEvent::Error("boom".to_owned())),
            content("b"),
        ]);
        let events: Vec<_> = shape_stream(inner, true).collect().await;

        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("a".to_owned()),
                StreamEvent::Error("boom".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn collect_text_joins_content() {
        let inner = shape_stream(stream::iter(vec![content("hello "), content("world")]), true);
        assert_eq!(collect_text(inner).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn collect_text_surfaces_error_events() {
        let inner: EventStream = Box::pin(stream::iter(vec![Ok(StreamEvent::Error("denied".to_owned()))]));
        let err = collect_text(inner).await.unwrap_err();
        assert!(matches!(err, LlmError::Upstream { status: None, .. }));
    }

    #[tokio::test]
    async fn lines_stream_handles_partial_chunks() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"a\":")),
            Ok(Bytes::from_static(b"1}\n{\"b\":2}\n")),
            Ok(Bytes::from_static(b"{\"c\":3}")),
        ];

        let lines: Vec<_> = lines_stream(stream::iter(chunks)).collect().await;
        let lines: Vec<_> = lines.into_iter().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]);
    }
}
