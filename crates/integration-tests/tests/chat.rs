mod harness;

use std::sync::{Arc, Mutex};

use harness::config::ConfigBuilder;
use harness::gateway::TestGateway;
use harness::mock_upstream::MockUpstream;
use manifold_llm::LlmError;
use manifold_llm::emulate::ToolExecutor;
use manifold_llm::types::ToolDefinition;

#[tokio::test]
async fn chat_completion_round_trips_through_the_catch_all() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new().with_openai(&mock.base_url()).build();

    let gateway = TestGateway::start(config).await.unwrap();

    let body = serde_json::json!({
        "model": "gpt-4",
        "messages": [{"role": "user", "content": "Hello"}],
    });

    let resp = gateway
        .client()
        .post(gateway.url("/v1/chat/completions"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["object"], "chat.completion");
    assert_eq!(json["choices"][0]["message"]["role"], "assistant");

    let content = json["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.contains("Hello") && content.contains("mock"), "got '{content}'");
    assert_eq!(mock.completion_count(), 1);
}

#[tokio::test]
async fn unknown_model_is_rejected_naming_the_model() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new().with_openai(&mock.base_url()).build();

    let gateway = TestGateway::start(config).await.unwrap();

    let body = serde_json::json!({
        "model": "model-x",
        "messages": [{"role": "user", "content": "Hello"}],
    });

    let resp = gateway
        .client()
        .post(gateway.url("/v1/chat/completions"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["error"]["type"], "invalid_request_error");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("model-x"), "got '{message}'");
    assert_eq!(mock.completion_count(), 0);
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new().with_openai(&mock.base_url()).build();

    let gateway = TestGateway::start(config).await.unwrap();

    let body = serde_json::json!({
        "model": "gpt-4",
        "messages": [],
    });

    let resp = gateway
        .client()
        .post(gateway.url("/v1/chat/completions"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);

    let json: serde_json::Value = resp.json().await.unwrap();
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("too short"), "got '{message}'");
}

#[tokio::test]
async fn unknown_role_is_rejected_naming_the_message() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new().with_openai(&mock.base_url()).build();

    let gateway = TestGateway::start(config).await.unwrap();

    let body = serde_json::json!({
        "model": "gpt-4",
        "messages": [{"role": "tool", "content": "x"}],
    });

    let resp = gateway
        .client()
        .post(gateway.url("/v1/chat/completions"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);

    let json: serde_json::Value = resp.json().await.unwrap();
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("messages.0.role"), "got '{message}'");
}

// -- Tool-call emulation --

struct RecordingExecutor {
    result: &'static str,
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ToolExecutor for RecordingExecutor {
    async fn execute(&self, tool: &ToolDefinition) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(tool.name.clone());
        Ok(self.result.to_owned())
    }
}

fn body_with_lookup_tool(model: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": "What is the answer?"}],
        "tools": [{
            "type": "function",
            "id": "ab3d9",
            "function": {
                "name": "lookup",
                "description": "look a thing up",
            },
        }],
    })
}

#[tokio::test]
async fn tool_recommendation_drives_a_second_round_trip() {
    let mock = MockUpstream::start_with_replies(&["toolId = ab3d9", "the stored answer is 42"])
        .await
        .unwrap();
    let config = ConfigBuilder::new().with_openai(&mock.base_url()).build();

    let executor = Arc::new(RecordingExecutor {
        result: "42",
        calls: Mutex::new(Vec::new()),
    });

    let gateway = TestGateway::start_with_executor(config, Arc::clone(&executor) as Arc<dyn ToolExecutor>)
        .await
        .unwrap();

    let resp = gateway
        .client()
        .post(gateway.url("/v1/chat/completions"))
        .json(&body_with_lookup_tool("gpt-4"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    let content = json["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.contains("42"), "got '{content}'");

    assert_eq!(mock.completion_count(), 2, "emulation should make two upstream calls");
    assert_eq!(executor.calls.lock().unwrap().as_slice(), ["lookup"]);
}

#[tokio::test]
async fn plain_reply_skips_the_emulation_round_trip() {
    let mock = MockUpstream::start_with_replies(&["just a normal answer"]).await.unwrap();
    let config = ConfigBuilder::new().with_openai(&mock.base_url()).build();

    let executor = Arc::new(RecordingExecutor {
        result: "unused",
        calls: Mutex::new(Vec::new()),
    });

    let gateway = TestGateway::start_with_executor(config, Arc::clone(&executor) as Arc<dyn ToolExecutor>)
        .await
        .unwrap();

    let resp = gateway
        .client()
        .post(gateway.url("/v1/chat/completions"))
        .json(&body_with_lookup_tool("gpt-4"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    let content = json["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.contains("just a normal answer"), "got '{content}'");

    assert_eq!(mock.completion_count(), 1);
    assert!(executor.calls.lock().unwrap().is_empty());
}
