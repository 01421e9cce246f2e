//! Ollama native chat provider, local or hosted

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use confluence_config::{LlmProviderConfig, OllamaMode};
use secrecy::ExposeSecret;
use serde_json::Value;

use super::{
    ChunkCallback, Provider, ProviderDefaults, ProviderSettings, ProviderStyle, WireFormat, decode_body, endpoint,
    env_api_key, finish_request,
};
use crate::convert::ollama::{self as convert, OllamaStreamState};
use crate::decode::{drive, ndjson_frames};
use crate::error::{LlmError, TransportError};
use crate::protocol::ollama::{OllamaChatChunk, OllamaMessage, OllamaRequest, OllamaTagList, OllamaTool};
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::{ChatOptions, LlmResponse, Message, ToolDefinition};

/// Large local models can take a while to answer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Whole timeout for the local liveness probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connect limit for the liveness probe, so a dead host fails fast
pub const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

const API_KEY_ENV: &str = "OLLAMA_API_KEY";

const MODELS: &[&str] = &[
    "llama3.3",
    "llama3.2",
    "llama3.1",
    "llama3",
    "mistral",
    "mixtral",
    "phi3",
    "gemma2",
    "qwen2.5",
    "deepseek-r1",
    "codellama",
    "llama2",
];

/// Identity defaults for a deployment mode
pub const fn defaults(mode: OllamaMode) -> ProviderDefaults {
    let (base_url, default_model) = match mode {
        OllamaMode::Local => ("http://localhost:11434/", "llama3.2"),
        OllamaMode::Cloud => ("https://ollama.com/", "llama3.3"),
    };

    ProviderDefaults {
        name: "ollama",
        api_key_env: API_KEY_ENV,
        base_url,
        default_model,
        models: MODELS,
        timeout: DEFAULT_TIMEOUT,
    }
}

/// Explicit mode, else cloud exactly when a credential is available
pub fn resolve_mode(explicit: Option<OllamaMode>, has_credential: bool) -> OllamaMode {
    let mode = explicit.unwrap_or(if has_credential { OllamaMode::Cloud } else { OllamaMode::Local });
    tracing::debug!(?mode, explicit = explicit.is_some(), "resolved ollama mode");
    mode
}

/// Ollama native chat provider
pub struct OllamaProvider {
    mode: OllamaMode,
    settings: ProviderSettings,
    transport: Arc<dyn HttpTransport>,
}

impl OllamaProvider {
    pub fn new(mode: OllamaMode, settings: ProviderSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            mode,
            settings,
            transport,
        }
    }

    /// Provider whose mode follows `OLLAMA_API_KEY`
    pub fn from_env(transport: Arc<dyn HttpTransport>) -> Self {
        let mode = resolve_mode(None, env_api_key(API_KEY_ENV).is_some());
        Self::new(mode, ProviderSettings::from_defaults(&defaults(mode)), transport)
    }

    /// Provider from a config entry; the mode picks the URL and model defaults
    pub fn from_config(name: &str, config: &LlmProviderConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let has_credential = config.api_key.is_some() || env_api_key(API_KEY_ENV).is_some();
        let mode = resolve_mode(config.mode, has_credential);
        Self::new(mode, ProviderSettings::from_config(name, config, &defaults(mode)), transport)
    }

    pub const fn mode(&self) -> OllamaMode {
        self.mode
    }

    /// Names of the models installed on the server; empty if it cannot be reached
    pub async fn installed_models(&self) -> Vec<String> {
        let request = self.authorize(HttpRequest::get(endpoint(&self.settings.base_url, "api/tags")));

        let body = match self.transport.get_json(request).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(provider = %self.settings.name, error = %e, "could not list installed models");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<OllamaTagList>(&body) {
            Ok(tags) => tags
                .models
                .into_iter()
                .filter_map(|tag| tag.name.or(tag.model))
                .collect(),
            Err(e) => {
                tracing::debug!(provider = %self.settings.name, error = %e, "unexpected model list");
                Vec::new()
            }
        }
    }

    async fn probe(&self) -> bool {
        let request = HttpRequest::get(endpoint(&self.settings.base_url, "api/tags"))
            .timeout(PROBE_TIMEOUT)
            .connect_timeout(PROBE_CONNECT_TIMEOUT);
        match self.transport.get(request).await {
            Ok(status) => status == 200,
            Err(e) => {
                tracing::debug!(provider = %self.settings.name, error = %e, "ollama is not reachable");
                false
            }
        }
    }

    /// Bearer credential, sent only to the hosted service
    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        match (self.mode, &self.settings.api_key) {
            (OllamaMode::Cloud, Some(key)) => request.bearer(key.expose_secret()),
            _ => request,
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
        stream: bool,
    ) -> OllamaRequest {
        OllamaRequest {
            model: self.settings.model(options),
            messages: self.format_messages(messages),
            stream,
            options: convert::build_options(options),
            tools: (!tools.is_empty()).then(|| self.format_tools(tools)),
        }
    }

    fn http_request(&self, options: &ChatOptions, body: &OllamaRequest) -> Result<HttpRequest, LlmError> {
        if self.mode == OllamaMode::Cloud && self.settings.api_key.is_none() {
            return Err(LlmError::NotConfigured {
                provider: self.settings.name.clone(),
            });
        }

        let url = endpoint(self.settings.base_url(options), "api/chat");
        let request = HttpRequest::post(url, serde_json::to_value(body)?).timeout(self.settings.timeout);
        Ok(self.authorize(request))
    }

    async fn send(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<LlmResponse, LlmError> {
        let body = self.build_request(messages, tools, options, false);
        let request = self.http_request(options, &body)?;
        let bytes = self.transport.post_json(request).await.map_err(ollama_error)?;
        self.parse_response(&bytes)
    }

    async fn send_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> Result<LlmResponse, LlmError> {
        let body = self.build_request(messages, tools, options, true);
        let model = body.model.clone();
        let request = self.http_request(options, &body)?;
        let stream = self.transport.post_stream(request).await.map_err(ollama_error)?;
        drive(ndjson_frames(stream), OllamaStreamState::new(), on_chunk, Some(model)).await
    }
}

/// Ollama reports failures as `{"error": "..."}`; name the backend in the message
fn ollama_error(error: TransportError) -> LlmError {
    match error {
        TransportError::Status { status, message } => LlmError::Transport(TransportError::Status {
            status,
            message: format!("Ollama API error: {message}"),
        }),
        other => LlmError::Transport(other),
    }
}

impl WireFormat for OllamaProvider {
    type Messages = Vec<OllamaMessage>;
    type Tool = OllamaTool;

    fn format_messages(&self, messages: &[Message]) -> Vec<OllamaMessage> {
        convert::format_messages(messages)
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> Vec<OllamaTool> {
        convert::format_tools(tools)
    }

    fn parse_response(&self, body: &[u8]) -> Result<LlmResponse, LlmError> {
        let (response, raw): (OllamaChatChunk, Value) = decode_body(body)?;
        Ok(convert::parse_response(response, raw, &self.settings.default_model))
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn style(&self) -> ProviderStyle {
        ProviderStyle::Ollama
    }

    /// Local: the server answers the probe. Cloud: a credential exists.
    async fn is_configured(&self) -> bool {
        match self.mode {
            OllamaMode::Local => self.probe().await,
            OllamaMode::Cloud => self.settings.api_key.is_some(),
        }
    }

    fn default_model(&self) -> &str {
        &self.settings.default_model
    }

    fn models(&self) -> Vec<String> {
        self.settings.models.clone()
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition], options: &ChatOptions) -> LlmResponse {
        finish_request(&self.settings.name, self.send(messages, tools, options).await)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> LlmResponse {
        finish_request(&self.settings.name, self.send_stream(messages, tools, options, on_chunk).await)
    }
}
