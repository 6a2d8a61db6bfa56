//! Mock upstream servers returning canned responses

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::{Json, Router, routing};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const DEFAULT_REPLY: &str = "Hello from the mock upstream";

/// Mock OpenAI-compatible backend
///
/// Serves `/v1/chat/completions` with canned replies, as SSE chunks when
/// the request asks for streaming and as a JSON body otherwise. Replies are
/// consumed in order; once the queue is empty the default reply is served.
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockUpstreamState>,
}

struct MockUpstreamState {
    completion_count: AtomicU32,
    replies: Mutex<VecDeque<String>>,
}

impl MockUpstream {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_replies(&[]).await
    }

    /// Start a mock server with a queue of canned replies
    pub async fn start_with_replies(replies: &[&str]) -> anyhow::Result<Self> {
        let state = Arc::new(MockUpstreamState {
            completion_count: AtomicU32::new(0),
            replies: Mutex::new(replies.iter().map(|reply| (*reply).to_owned()).collect()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as an upstream
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of completion requests received
    pub fn completion_count(&self) -> u32 {
        self.state.completion_count.load(Ordering::Relaxed)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    #[serde(default)]
    stream: bool,
}

async fn handle_chat_completions(
    State(state): State<Arc<MockUpstreamState>>,
    Json(request): Json<ChatRequest>,
) -> axum::response::Response {
    state.completion_count.fetch_add(1, Ordering::Relaxed);

    let content = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| DEFAULT_REPLY.to_owned());

    if request.stream {
        return streaming_response(&request.model, &content).into_response();
    }

    Json(serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000_u64,
        "model": request.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
    }))
    .into_response()
}

/// Build an SSE streaming response body, one chunk per word
fn streaming_response(model: &str, content: &str) -> impl IntoResponse {
    let mut body = String::new();

    body.push_str(&sse_chunk(
        model,
        serde_json::json!({"role": "assistant", "content": ""}),
        None,
    ));

    for word in content.split_whitespace() {
        body.push_str(&sse_chunk(model, serde_json::json!({"content": format!("{word} ")}), None));
    }

    body.push_str(&sse_chunk(model, serde_json::json!({}), Some("stop")));
    body.push_str("data: [DONE]\n\n");

    (StatusCode::OK, [(CONTENT_TYPE, "text/event-stream")], body)
}

fn sse_chunk(model: &str, delta: serde_json::Value, finish_reason: Option<&str>) -> String {
    let chunk = serde_json::json!({
        "id": "chatcmpl-mock-stream",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000_u64,
        "model": model,
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}],
    });
    format!("data: {chunk}\n\n")
}

/// Mock Google Generative Language backend
///
/// Serves `streamGenerateContent` with one fixed raw body, pretty-printed
/// the way the real API delivers its incremental JSON array.
pub struct MockGoogle {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl MockGoogle {
    /// Start a mock serving the given raw stream body
    pub async fn start(body: String) -> anyhow::Result<Self> {
        let app = Router::new().route(
            "/v1beta/models/gemini-pro:streamGenerateContent",
            routing::post(move || {
                let body = body.clone();
                async move { (StatusCode::OK, body) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown })
    }

    /// Base URL for configuring the mock as an upstream
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockGoogle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Raw stream body carrying one text delta per envelope
pub fn google_text_body(deltas: &[&str]) -> String {
    let envelopes: Vec<serde_json::Value> = deltas
        .iter()
        .map(|delta| {
            serde_json::json!({
                "candidates": [{
                    "content": {"parts": [{"text": delta}]},
                    "finishReason": "STOP",
                }],
            })
        })
        .collect();

    serde_json::to_string_pretty(&envelopes).unwrap()
}

/// Raw stream body carrying an explicit error payload
pub fn google_error_body(message: &str) -> String {
    serde_json::to_string_pretty(&serde_json::json!({
        "error": {"code": 400, "message": message, "status": "INVALID_ARGUMENT"},
    }))
    .unwrap()
}

/// Raw stream body answering with a function call
pub fn google_function_call_body(name: &str, args: serde_json::Value) -> String {
    serde_json::to_string_pretty(&serde_json::json!([{
        "candidates": [{
            "content": {"parts": [{"functionCall": {"name": name, "args": args}}]},
        }],
    }]))
    .unwrap()
}

/// Mock image space backend
///
/// Serves the job submit/poll pair of the sd/xl spaces plus an upscale
/// endpoint, always succeeding on the first poll.
pub struct MockImageSpace {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockImageSpaceState>,
}

struct MockImageSpaceState {
    job_count: AtomicU32,
    magnify_count: AtomicU32,
}

const IMAGE_URL: &str = "https://img.example.com/out.png";
const MAGNIFIED_URL: &str = "https://img.example.com/out-hd.png";

impl MockImageSpace {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockImageSpaceState {
            job_count: AtomicU32::new(0),
            magnify_count: AtomicU32::new(0),
        });

        let app = Router::new()
            .route("/job", routing::post(handle_job_submit))
            .route("/job/{id}", routing::get(handle_job_status))
            .route("/magnify", routing::post(handle_magnify))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as a space
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the upscale endpoint
    pub fn magnify_url(&self) -> String {
        format!("http://{}/magnify", self.addr)
    }

    /// URL the mock hands out for finished jobs
    pub fn image_url(&self) -> &'static str {
        IMAGE_URL
    }

    /// URL the mock hands out for upscaled images
    pub fn magnified_url(&self) -> &'static str {
        MAGNIFIED_URL
    }

    /// Number of jobs submitted
    pub fn job_count(&self) -> u32 {
        self.state.job_count.load(Ordering::Relaxed)
    }

    /// Number of upscale requests received
    pub fn magnify_count(&self) -> u32 {
        self.state.magnify_count.load(Ordering::Relaxed)
    }
}

impl Drop for MockImageSpace {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_job_submit(State(state): State<Arc<MockImageSpaceState>>) -> impl IntoResponse {
    state.job_count.fetch_add(1, Ordering::Relaxed);
    Json(serde_json::json!({"job": "job-1"}))
}

async fn handle_job_status(State(_state): State<Arc<MockImageSpaceState>>) -> impl IntoResponse {
    Json(serde_json::json!({"status": "succeeded", "imageUrl": IMAGE_URL}))
}

async fn handle_magnify(State(state): State<Arc<MockImageSpaceState>>) -> impl IntoResponse {
    state.magnify_count.fetch_add(1, Ordering::Relaxed);
    Json(serde_json::json!({"url": MAGNIFIED_URL}))
}
