mod harness;

use confluence_llm::{ChatOptions, FinishReason, Message, OllamaProvider, SideEvent, ToolDefinition, Usage};
use harness::config::ProviderBuilder;
use harness::mock_backend::{MockBackend, Route};
use serde_json::json;

fn local(backend: &MockBackend) -> ProviderBuilder {
    ProviderBuilder::new("ollama", &backend.url("")).field("mode", "local")
}

#[tokio::test]
async fn stream_over_http_with_thinking_and_tools() {
    let backend = MockBackend::start(vec![Route::post("/api/chat").ndjson(&[
        json!({"model": "qwen3", "message": {"role": "assistant", "content": "", "thinking": "User wants the time."}, "done": false}),
        json!({"model": "qwen3", "message": {"role": "assistant", "content": "Checking."}, "done": false}),
        json!({"model": "qwen3", "message": {"role": "assistant", "content": "", "tool_calls": [
            {"function": {"name": "clock", "arguments": {"tz": "UTC"}}}
        ]}, "done": false}),
        json!({"model": "qwen3", "message": {"role": "assistant", "content": ""}, "done": true, "done_reason": "stop",
            "prompt_eval_count": 18, "eval_count": 9}),
    ])])
    .await
    .unwrap();

    let provider = local(&backend).build();

    let mut text = String::new();
    let mut thoughts = Vec::new();
    let mut calls = Vec::new();
    let mut on_chunk = |chunk: &str, side: Option<&SideEvent>| {
        text.push_str(chunk);
        match side {
            Some(SideEvent::Reasoning { text: thought, channel }) => thoughts.push((thought.clone(), channel.clone())),
            Some(SideEvent::ToolCall(call)) => calls.push(call.clone()),
            _ => {}
        }
    };

    let clock = ToolDefinition::new("clock", "Current time", json!({"type": "object"}));
    let options = ChatOptions::default().with_model("qwen3").with_temperature(0.1);
    let response = provider
        .chat_stream(&[Message::user("What time is it?")], &[clock], &options, &mut on_chunk)
        .await;

    assert_eq!(text, "Checking.");
    assert_eq!(thoughts, [("User wants the time.".to_owned(), "thinking".to_owned())]);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].id.starts_with("call_"));
    assert_eq!(response.content, "Checking.");
    assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    assert_eq!(response.tool_calls, calls);
    assert_eq!(json!(response.tool_calls[0].arguments), json!({"tz": "UTC"}));
    assert_eq!(response.usage, Some(Usage::new(18, 9)));

    let request = backend.last_request();
    assert_eq!(request.path, "/api/chat");
    assert_eq!(request.header("authorization"), None);
    assert_eq!(request.body["stream"], true);
    assert_eq!(request.body["options"]["temperature"], 0.1);
    assert_eq!(request.body["tools"][0]["function"]["name"], "clock");
}

#[tokio::test]
async fn whole_response_over_http() {
    let backend = MockBackend::start(vec![Route::post("/api/chat").json(&json!({
        "model": "llama3.2",
        "message": {"role": "assistant", "content": "Hi!"},
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 5,
        "eval_count": 2
    }))])
    .await
    .unwrap();

    let provider = local(&backend).build();
    let response = provider
        .chat(&[Message::user("Hello")], &[], &ChatOptions::default().with_max_tokens(32))
        .await;

    assert_eq!(response.content, "Hi!");
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(response.model.as_deref(), Some("llama3.2"));
    assert_eq!(response.usage, Some(Usage::new(5, 2)));

    let body = backend.last_request().body;
    assert_eq!(body["stream"], false);
    assert_eq!(body["model"], "llama3.2");
    assert_eq!(body["options"]["num_predict"], 32);
}

#[tokio::test]
async fn local_mode_probes_server() {
    let up = MockBackend::start(vec![Route::get("/api/tags").json(&json!({"models": []}))])
        .await
        .unwrap();
    assert!(local(&up).build().is_configured().await);
    assert_eq!(up.last_request().path, "/api/tags");

    let down = MockBackend::start(vec![Route::get("/api/tags").status(500)]).await.unwrap();
    assert!(!local(&down).build().is_configured().await);
}

#[tokio::test]
async fn installed_models_come_from_tags() {
    let backend = MockBackend::start(vec![Route::get("/api/tags").json(&json!({
        "models": [{"name": "llama3.2:latest"}, {"model": "mistral:7b"}]
    }))])
    .await
    .unwrap();

    let config = local(&backend).config();
    let (name, entry) = config.providers.first().expect("one provider");
    let transport = confluence_llm::ReqwestTransport::new(std::time::Duration::from_secs(5)).unwrap();
    let transport = std::sync::Arc::new(transport);
    let provider = OllamaProvider::from_config(name, entry, transport);

    assert_eq!(provider.installed_models().await, ["llama3.2:latest", "mistral:7b"]);
}

#[tokio::test]
async fn cloud_mode_sends_bearer() {
    let backend = MockBackend::start(vec![Route::post("/api/chat").json(&json!({
        "model": "llama3.3",
        "message": {"role": "assistant", "content": "ok"},
        "done": true
    }))])
    .await
    .unwrap();

    let provider = ProviderBuilder::new("ollama", &backend.url(""))
        .field("mode", "cloud")
        .api_key("ollama-cloud-key")
        .build();
    assert!(provider.is_configured().await);

    let response = provider.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;
    assert_eq!(response.content, "ok");

    let request = backend.last_request();
    assert_eq!(request.header("authorization"), Some("Bearer ollama-cloud-key"));
    assert_eq!(request.body["model"], "llama3.3");
}
