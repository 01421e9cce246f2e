mod harness;

use confluence_config::Config;
use confluence_llm::{ChatOptions, Message, ProviderRegistry, ProviderStyle};
use harness::mock_backend::{MockBackend, Route};
use indoc::formatdoc;
use serde_json::json;

#[tokio::test]
async fn configured_registry_routes_by_name_and_alias() {
    let backend = MockBackend::start(vec![
        Route::post("/anthropic/messages").json(&json!({"content": [{"type": "text", "text": "from claude"}]})),
        Route::post("/openai/chat/completions").json(&json!({"choices": [{"message": {"content": "from gpt"}}]})),
    ])
    .await
    .unwrap();

    let config = Config::from_toml_str(&formatdoc! {r#"
        [providers.anthropic]
        type = "anthropic"
        api_key = "sk-ant"
        base_url = "{anthropic}"

        [providers.work-openai]
        type = "openai"
        api_key = "sk-oai"
        base_url = "{openai}"
        default_model = "gpt-4o-mini"
    "#, anthropic = backend.url("anthropic"), openai = backend.url("openai")})
    .unwrap();

    let registry = ProviderRegistry::from_config(&config).unwrap();
    assert_eq!(registry.names().collect::<Vec<_>>(), ["anthropic", "work-openai"]);

    let claude = registry.get("Claude").expect("alias resolves");
    assert_eq!(claude.style(), ProviderStyle::Anthropic);
    let reply = claude.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;
    assert_eq!(reply.content, "from claude");

    let openai = registry.require("work-openai").unwrap();
    assert_eq!(openai.default_model(), "gpt-4o-mini");
    let reply = openai.chat(&[Message::user("Hi")], &[], &ChatOptions::default()).await;
    assert_eq!(reply.content, "from gpt");
    assert_eq!(backend.last_request().body["model"], "gpt-4o-mini");

    assert!(registry.require("mistral").is_err());
}

#[tokio::test]
async fn auto_detect_picks_first_configured_in_priority_order() {
    let backend = MockBackend::start(vec![Route::get("/api/tags").status(503)]).await.unwrap();

    let config = Config::from_toml_str(&formatdoc! {r#"
        [providers.ollama]
        type = "ollama"
        mode = "local"
        base_url = "{ollama}"

        [providers.anthropic]
        type = "anthropic"
        api_key = "sk-ant"
    "#, ollama = backend.url("")})
    .unwrap();

    let registry = ProviderRegistry::from_config(&config).unwrap();
    let detected = registry.auto_detect().await.expect("anthropic has a key");
    assert_eq!(detected.name(), "anthropic");
}
