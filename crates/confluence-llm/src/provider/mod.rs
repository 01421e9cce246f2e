//! Provider trait and the three backend adapters

pub mod anthropic;
pub mod ollama;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use confluence_config::LlmProviderConfig;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::LlmError;
use crate::types::{ChatOptions, LlmResponse, Message, SideEvent, ToolDefinition};

/// Default request timeout for hosted backends
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Wire family an adapter speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderStyle {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI chat completions
    OpenAi,
    /// Ollama native chat
    Ollama,
}

impl ProviderStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

/// Streaming callback: a text fragment plus an optional side-channel event
///
/// Content deltas arrive as `(text, None)`; reasoning, completed tool calls and
/// activity arrive as `("", Some(event))`.
pub type ChunkCallback<'a> = dyn FnMut(&str, Option<&SideEvent>) + Send + 'a;

/// Trait implemented by each LLM backend adapter
///
/// `chat` and `chat_stream` never fail: every transport or protocol error is
/// returned as [`LlmResponse::error`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Wire family
    fn style(&self) -> ProviderStyle;

    /// Whether requests can be served right now
    async fn is_configured(&self) -> bool;

    /// Model used when options do not name one
    fn default_model(&self) -> &str;

    /// Known model catalog
    fn models(&self) -> Vec<String>;

    /// Send one non-streaming request
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition], options: &ChatOptions) -> LlmResponse;

    /// Send one streaming request, forwarding increments to `on_chunk`
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> LlmResponse;
}

/// Request and response shaping for one wire family
pub trait WireFormat {
    /// Formatted conversation, possibly with extracted fields
    type Messages: Serialize;
    /// One tool declaration
    type Tool: Serialize;

    fn format_messages(&self, messages: &[Message]) -> Self::Messages;

    fn format_tools(&self, tools: &[ToolDefinition]) -> Vec<Self::Tool>;

    /// Decode a complete non-streaming response body
    fn parse_response(&self, body: &[u8]) -> Result<LlmResponse, LlmError>;
}

/// Fixed identity of a backend
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefaults {
    /// Registry name when the config does not give one
    pub name: &'static str,
    /// Environment variable read when no key is configured
    pub api_key_env: &'static str,
    /// API root, with a trailing slash
    pub base_url: &'static str,
    pub default_model: &'static str,
    /// Advertised model list
    pub models: &'static [&'static str],
    /// Whole-request timeout
    pub timeout: Duration,
}

/// Resolved settings for one adapter instance
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Registry name
    pub name: String,
    /// Configured key, falling back to the environment
    pub api_key: Option<SecretString>,
    pub base_url: Url,
    /// Model used when a call does not pick one
    pub default_model: String,
    pub models: Vec<String>,
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Settings from the backend's defaults and its environment variable
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen).
    pub fn from_defaults(defaults: &ProviderDefaults) -> Self {
        Self {
            name: defaults.name.to_owned(),
            api_key: env_api_key(defaults.api_key_env),
            base_url: Url::parse(defaults.base_url).expect("valid default URL"),
            default_model: defaults.default_model.to_owned(),
            models: defaults.models.iter().map(|&m| m.to_owned()).collect(),
            timeout: defaults.timeout,
        }
    }

    /// Overlay a config entry on the backend's defaults
    pub fn from_config(name: &str, config: &LlmProviderConfig, defaults: &ProviderDefaults) -> Self {
        let mut settings = Self::from_defaults(defaults);
        name.clone_into(&mut settings.name);

        if let Some(key) = config.api_key.clone() {
            settings.api_key = Some(key);
        }
        if let Some(url) = config.base_url.clone() {
            settings.base_url = url;
        }
        if let Some(model) = config.default_model.clone() {
            settings.default_model = model;
        }
        if !config.models.is_empty() {
            settings.models.clone_from(&config.models);
        }
        match config.timeout() {
            Ok(Some(timeout)) => settings.timeout = timeout,
            Ok(None) => {}
            Err(e) => tracing::warn!(provider = %name, error = %e, "ignoring invalid timeout"),
        }

        settings
    }

    /// Per-call base URL, falling back to the configured one
    pub fn base_url<'a>(&'a self, options: &'a ChatOptions) -> &'a Url {
        options.base_url.as_ref().unwrap_or(&self.base_url)
    }

    /// Per-call model, falling back to the configured default
    pub fn model(&self, options: &ChatOptions) -> String {
        options.model.clone().unwrap_or_else(|| self.default_model.clone())
    }
}

/// Non-empty value of `var`
pub fn env_api_key(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Join `path` onto `base`, tolerating a missing trailing slash
pub fn endpoint(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    format!("{base}/{path}")
}

/// Decode a whole body into `T`, keeping the raw JSON alongside
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<(T, Value), LlmError> {
    let raw: Value = serde_json::from_slice(body).map_err(|e| LlmError::Protocol(e.to_string()))?;
    let parsed = T::deserialize(&raw).map_err(|e| LlmError::Protocol(e.to_string()))?;
    Ok((parsed, raw))
}

/// Collapse a failed request into an error response
pub(crate) fn finish_request(provider: &str, result: Result<LlmResponse, LlmError>) -> LlmResponse {
    result.unwrap_or_else(|e| {
        tracing::error!(provider = %provider, error = %e, "upstream request failed");
        e.into_response()
    })
}
