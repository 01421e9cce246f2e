mod harness;

use confluence_llm::{ActivityEvent, ChatOptions, FinishReason, Message, SideEvent, ToolDefinition, Usage};
use harness::config::ProviderBuilder;
use harness::mock_backend::{MockBackend, Route, data};
use serde_json::json;

fn search_tool() -> ToolDefinition {
    let schema = json!({"type": "object", "properties": {"q": {"type": "string"}}});
    ToolDefinition::new("search_docs", "Search the handbook", schema)
}

#[tokio::test]
async fn whole_response_over_http() {
    let backend = MockBackend::start(vec![Route::post("/v1/chat/completions").json(&json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Four."},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 11, "completion_tokens": 2, "total_tokens": 13}
    }))])
    .await
    .unwrap();

    let provider = ProviderBuilder::new("openai", &backend.url("v1")).api_key("sk-mock").build();
    let options = ChatOptions::default().with_model("gpt-4o-mini").with_max_tokens(64);
    let response = provider.chat(&[Message::user("2 + 2?")], &[], &options).await;

    assert!(!response.is_error(), "{:?}", response.error);
    assert_eq!(response.content, "Four.");
    assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(response.usage, Some(Usage::new(11, 2)));
    assert_eq!(response.raw["id"], "chatcmpl-1");

    let request = backend.last_request();
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.header("authorization"), Some("Bearer sk-mock"));
    assert_eq!(request.body["model"], "gpt-4o-mini");
    assert_eq!(request.body["max_tokens"], 64);
    assert_eq!(request.body["stream"], false);
}

#[tokio::test]
async fn stream_over_http_with_parallel_tool_calls() {
    let frames = [
        data(&json!({"model": "gpt-4o", "choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]})),
        data(&json!({"model": "gpt-4o", "choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "id": "call_a", "type": "function", "function": {"name": "search_docs", "arguments": "{\"q\":"}},
            {"index": 1, "id": "call_b", "type": "function", "function": {"name": "search_docs", "arguments": ""}}
        ]}}]})),
        data(&json!({"model": "gpt-4o", "choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 1, "function": {"arguments": "{\"q\":\"leave\"}"}},
            {"index": 0, "function": {"arguments": "\"expenses\"}"}}
        ]}}]})),
        data(&json!({"model": "gpt-4o", "choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]})),
        "data: [DONE]".to_owned(),
    ];
    let backend = MockBackend::start(vec![Route::post("/v1/chat/completions").sse(frames.iter().map(String::as_str))])
        .await
        .unwrap();

    let provider = ProviderBuilder::new("openai", &backend.url("v1")).api_key("sk-mock").build();

    let mut announced = Vec::new();
    let mut on_chunk = |_: &str, side: Option<&SideEvent>| {
        if let Some(SideEvent::ToolCall(call)) = side {
            announced.push(call.id.clone());
        }
    };
    let messages = [Message::user("Expense and leave policy?")];
    let response = provider
        .chat_stream(&messages, &[search_tool()], &ChatOptions::default(), &mut on_chunk)
        .await;

    assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    assert_eq!(announced, ["call_a", "call_b"]);
    assert_eq!(response.tool_calls.len(), 2);
    assert_eq!(json!(response.tool_calls[0].arguments), json!({"q": "expenses"}));
    assert_eq!(json!(response.tool_calls[1].arguments), json!({"q": "leave"}));
    assert!(response.content.is_empty());

    let body = backend.last_request().body;
    assert_eq!(body["stream"], true);
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["tools"][0]["function"]["name"], "search_docs");
}

#[tokio::test]
async fn groq_gpt_oss_stream_reports_search_activity() {
    let model = "openai/gpt-oss-20b";
    let frames = [
        data(&json!({"model": model, "choices": [{"delta": {"reasoning": "Look it up."}}]})),
        data(&json!({"model": model, "choices": [{"delta": {"executed_tools": [
            {"index": 0, "type": "browser_search", "name": "browser.search", "arguments": "{\"query\":\"tokio 1.0 release\"}", "output": "..."}
        ]}}]})),
        data(&json!({"model": model, "choices": [{"delta": {"content": "December 2020."}}]})),
        data(&json!({"model": model, "choices": [{"delta": {}, "finish_reason": "stop"}],
            "x_groq": {"usage": {"prompt_tokens": 30, "completion_tokens": 40, "total_tokens": 70}}})),
        "data: [DONE]".to_owned(),
    ];
    let route = Route::post("/openai/v1/chat/completions").sse(frames.iter().map(String::as_str));
    let backend = MockBackend::start(vec![route]).await.unwrap();

    let provider = ProviderBuilder::new("groq", &backend.url("openai/v1")).api_key("gsk-mock").build();

    let mut reasoning = String::new();
    let mut activities = Vec::new();
    let mut on_chunk = |_: &str, side: Option<&SideEvent>| match side {
        Some(SideEvent::Reasoning { text, .. }) => reasoning.push_str(text),
        Some(SideEvent::Activity(activity)) => activities.push(activity.clone()),
        _ => {}
    };

    let options = ChatOptions::default().with_model(model);
    let response = provider
        .chat_stream(&[Message::user("When did tokio 1.0 ship?")], &[], &options, &mut on_chunk)
        .await;

    assert_eq!(response.content, "December 2020.");
    assert_eq!(reasoning, "Look it up.");
    assert_eq!(activities, [ActivityEvent::web_search("tokio 1.0 release")]);
    assert_eq!(response.usage, Some(Usage::new(30, 40)));

    let body = backend.last_request().body;
    assert_eq!(body["tools"], json!([{"type": "browser_search"}]));
    assert_eq!(body["tool_choice"], "auto");
    assert!(body.get("max_tokens").is_none());
}

#[tokio::test]
async fn compatible_backends_share_the_wire_format() {
    let reply = json!({"choices": [{"message": {"content": "pong"}, "finish_reason": "stop"}]});
    let backend = MockBackend::start(vec![Route::post("/v1/chat/completions").json(&reply)])
        .await
        .unwrap();

    for kind in ["cerebras", "together", "fireworks"] {
        let provider = ProviderBuilder::new(kind, &backend.url("v1")).api_key("key").build();
        assert_eq!(provider.name(), kind);

        let response = provider.chat(&[Message::user("ping")], &[], &ChatOptions::default()).await;
        assert_eq!(response.content, "pong", "{kind}");
        assert_eq!(backend.last_request().body["model"], provider.default_model());
    }

    assert_eq!(backend.requests().len(), 3);
}
