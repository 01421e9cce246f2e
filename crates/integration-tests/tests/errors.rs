mod harness;

use std::time::Duration;

use confluence_llm::{ChatOptions, FinishReason, Message};
use harness::config::ProviderBuilder;
use harness::mock_backend::{MockBackend, Route, data, event};
use serde_json::json;

#[tokio::test]
async fn anthropic_status_error_in_both_modes() {
    let backend = MockBackend::start(vec![Route::post("/v1/messages").status(401).json(&json!({
        "type": "error",
        "error": {"type": "authentication_error", "message": "invalid x-api-key"}
    }))])
    .await
    .unwrap();
    let provider = ProviderBuilder::new("anthropic", &backend.url("v1")).api_key("wrong").build();

    let response = provider.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;
    assert_eq!(response.finish_reason, FinishReason::Error);
    assert_eq!(response.error_message(), Some("API error (401): invalid x-api-key"));

    let mut chunks = 0;
    let response = provider
        .chat_stream(&[Message::user("Hi")], &[], &ChatOptions::default(), &mut |_, _| chunks += 1)
        .await;
    assert_eq!(response.error_message(), Some("API error (401): invalid x-api-key"));
    assert_eq!(chunks, 0);
}

#[tokio::test]
async fn openai_rate_limit_message_is_extracted() {
    let backend = MockBackend::start(vec![Route::post("/v1/chat/completions").status(429).json(&json!({
        "error": {"message": "Rate limit reached for gpt-4o", "type": "requests", "code": "rate_limit_exceeded"}
    }))])
    .await
    .unwrap();
    let provider = ProviderBuilder::new("openai", &backend.url("v1")).api_key("sk-mock").build();

    let response = provider.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;
    assert_eq!(response.error_message(), Some("API error (429): Rate limit reached for gpt-4o"));
    assert!(response.content.is_empty());
    assert!(response.tool_calls.is_empty());
}

#[tokio::test]
async fn ollama_errors_name_the_backend() {
    let not_found = json!({"error": "model \"nope\" not found"});
    let backend = MockBackend::start(vec![Route::post("/api/chat").status(404).json(&not_found)])
        .await
        .unwrap();
    let provider = ProviderBuilder::new("ollama", &backend.url("")).field("mode", "local").build();

    let options = ChatOptions::default().with_model("nope");
    let response = provider
        .chat_stream(&[Message::user("Hi")], &[], &options, &mut |_, _| {})
        .await;
    assert_eq!(response.error_message(), Some("API error (404): Ollama API error: model \"nope\" not found"));
}

#[tokio::test]
async fn plain_text_error_body_is_kept() {
    let backend = MockBackend::start(vec![Route::post("/v1/chat/completions").status(502).text("upstream unavailable")])
        .await
        .unwrap();
    let provider = ProviderBuilder::new("together", &backend.url("v1")).api_key("key").build();

    let response = provider.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;
    assert_eq!(response.error_message(), Some("API error (502): upstream unavailable"));
}

#[tokio::test]
async fn in_stream_error_discards_partial_text() {
    let frames = [
        event(
            "content_block_delta",
            &json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Half an ans"}}),
        ),
        event("error", &json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}})),
    ];
    let backend = MockBackend::start(vec![Route::post("/v1/messages").sse(frames.iter().map(String::as_str))])
        .await
        .unwrap();
    let provider = ProviderBuilder::new("anthropic", &backend.url("v1")).api_key("key").build();

    let mut streamed = String::new();
    let response = provider
        .chat_stream(&[Message::user("Hi")], &[], &ChatOptions::default(), &mut |chunk, _| streamed.push_str(chunk))
        .await;

    assert_eq!(streamed, "Half an ans");
    assert!(response.is_error());
    assert_eq!(response.error_message(), Some("Overloaded"));
    assert!(response.content.is_empty());
}

#[tokio::test]
async fn malformed_frames_are_skipped() {
    let frames = [
        "data: {not json".to_owned(),
        data(&json!({"choices": [{"delta": {"content": "still "}}]})),
        ": keep-alive comment".to_owned(),
        data(&json!({"choices": [{"delta": {"content": "here"}, "finish_reason": "stop"}]})),
        "data: [DONE]".to_owned(),
    ];
    let backend = MockBackend::start(vec![Route::post("/v1/chat/completions").sse(frames.iter().map(String::as_str))])
        .await
        .unwrap();
    let provider = ProviderBuilder::new("fireworks", &backend.url("v1")).api_key("key").build();

    let response = provider
        .chat_stream(&[Message::user("Hi")], &[], &ChatOptions::default(), &mut |_, _| {})
        .await;
    assert!(!response.is_error(), "{:?}", response.error);
    assert_eq!(response.content, "still here");
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn connection_refused_is_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = ProviderBuilder::new("openai", &format!("http://{addr}/v1")).api_key("key").build();
    let response = provider.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;

    assert!(response.is_error());
    assert!(
        response.error_message().is_some_and(|message| message.starts_with("request failed")),
        "{:?}",
        response.error
    );
}

#[tokio::test]
async fn slow_backend_times_out() {
    let backend = MockBackend::start(vec![
        Route::post("/v1/messages")
            .delay(Duration::from_secs(5))
            .json(&json!({"content": []})),
    ])
    .await
    .unwrap();
    let provider = ProviderBuilder::new("anthropic", &backend.url("v1"))
        .api_key("key")
        .field("timeout", "1s")
        .build();

    let response = provider.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;
    assert_eq!(response.error_message(), Some("request timed out"));
}
