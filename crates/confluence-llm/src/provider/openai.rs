//! OpenAI-compatible chat completions provider
//!
//! One adapter serves `OpenAI`, Groq, Cerebras, Together and Fireworks; only the
//! identity differs. Groq's gpt-oss models additionally get the server-side
//! `browser_search` tool.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use super::{
    ChunkCallback, DEFAULT_TIMEOUT, Provider, ProviderDefaults, ProviderSettings, ProviderStyle, WireFormat,
    decode_body, endpoint, finish_request,
};
use crate::convert::openai::{self as convert, OpenAiStreamState};
use crate::decode::{drive, sse_frames};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiTool};
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::{ChatOptions, LlmResponse, Message, ToolDefinition};

const DEFAULT_TEMPERATURE: f64 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Groq caps `max_completion_tokens` here for gpt-oss
const GPT_OSS_MAX_COMPLETION_TOKENS: u32 = 65536;

/// Members of the OpenAI-compatible family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenAiBackend {
    OpenAi,
    Groq,
    Cerebras,
    Together,
    Fireworks,
}

impl OpenAiBackend {
    pub const ALL: [Self; 5] = [Self::OpenAi, Self::Groq, Self::Cerebras, Self::Together, Self::Fireworks];

    pub fn name(self) -> &'static str {
        self.defaults().name
    }

    /// Identity defaults for this backend
    pub fn defaults(self) -> &'static ProviderDefaults {
        match self {
            Self::OpenAi => &OPENAI,
            Self::Groq => &GROQ,
            Self::Cerebras => &CEREBRAS,
            Self::Together => &TOGETHER,
            Self::Fireworks => &FIREWORKS,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|backend| backend.name() == name)
    }
}

static OPENAI: ProviderDefaults = ProviderDefaults {
    name: "openai",
    api_key_env: "OPENAI_API_KEY",
    base_url: "https://api.openai.com/v1/",
    default_model: "gpt-4o",
    models: &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo", "o1-preview", "o1-mini"],
    timeout: DEFAULT_TIMEOUT,
};

static GROQ: ProviderDefaults = ProviderDefaults {
    name: "groq",
    api_key_env: "GROQ_API_KEY",
    base_url: "https://api.groq.com/openai/v1/",
    default_model: "llama-3.3-70b-versatile",
    models: &[
        "llama-3.3-70b-versatile",
        "llama-3.1-70b-versatile",
        "llama-3.1-8b-instant",
        "gemma2-9b-it",
        "mixtral-8x7b-32768",
        "deepseek-r1-distill-llama-70b",
        "meta-llama/llama-4-scout-17b-16e-instruct",
        "meta-llama/llama-4-maverick-17b-128e-instruct",
        "openai/gpt-oss-120b",
        "moonshotai/kimi-k2-instruct-0905",
        "llama-3.2-11b-vision-preview",
        "llama-3.2-90b-vision-preview",
    ],
    timeout: DEFAULT_TIMEOUT,
};

static CEREBRAS: ProviderDefaults = ProviderDefaults {
    name: "cerebras",
    api_key_env: "CEREBRAS_API_KEY",
    base_url: "https://api.cerebras.ai/v1/",
    default_model: "openai/gpt-oss-120b",
    models: &["openai/gpt-oss-120b", "llama-3.3-70b", "llama-3.1-8b", "llama-4-scout-17b-16e", "qwen-3-32b"],
    timeout: DEFAULT_TIMEOUT,
};

static TOGETHER: ProviderDefaults = ProviderDefaults {
    name: "together",
    api_key_env: "TOGETHER_API_KEY",
    base_url: "https://api.together.xyz/v1/",
    default_model: "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo",
    models: &[
        "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo",
        "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo",
        "mistralai/Mixtral-8x7B-Instruct-v0.1",
        "Qwen/Qwen2.5-72B-Instruct-Turbo",
    ],
    timeout: DEFAULT_TIMEOUT,
};

static FIREWORKS: ProviderDefaults = ProviderDefaults {
    name: "fireworks",
    api_key_env: "FIREWORKS_API_KEY",
    base_url: "https://api.fireworks.ai/inference/v1/",
    default_model: "accounts/fireworks/models/llama-v3p1-70b-instruct",
    models: &[
        "accounts/fireworks/models/llama-v3p1-70b-instruct",
        "accounts/fireworks/models/llama-v3p1-8b-instruct",
    ],
    timeout: DEFAULT_TIMEOUT,
};

/// Chat completions provider for any member of the family
pub struct OpenAiCompatibleProvider {
    backend: OpenAiBackend,
    settings: ProviderSettings,
    transport: Arc<dyn HttpTransport>,
}

impl OpenAiCompatibleProvider {
    pub fn new(backend: OpenAiBackend, settings: ProviderSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            backend,
            settings,
            transport,
        }
    }

    /// Provider with the backend's defaults and environment credential
    pub fn from_env(backend: OpenAiBackend, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(backend, ProviderSettings::from_defaults(backend.defaults()), transport)
    }

    pub const fn backend(&self) -> OpenAiBackend {
        self.backend
    }

    /// Groq gpt-oss models run server-side browser search
    fn uses_browser_search(&self, model: &str) -> bool {
        self.backend == OpenAiBackend::Groq && model.contains("gpt-oss")
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
        stream: bool,
    ) -> OpenAiRequest {
        let model = self.settings.model(options);

        let mut request = OpenAiRequest {
            messages: self.format_messages(messages),
            temperature: Some(options.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            max_tokens: None,
            max_completion_tokens: None,
            tools: None,
            tool_choice: None,
            stream,
            model,
        };

        match options.max_completion_tokens {
            Some(budget) => request.max_completion_tokens = Some(budget),
            None => request.max_tokens = Some(options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        }

        if !tools.is_empty() {
            request.tools = Some(self.format_tools(tools));
            let choice = options.tool_choice.as_ref();
            request.tool_choice = Some(choice.map_or_else(|| json!("auto"), convert::format_tool_choice));
        }

        if self.uses_browser_search(&request.model) {
            tracing::debug!(provider = %self.settings.name, model = %request.model, "enabling browser search");
            request.tools.get_or_insert_with(Vec::new).push(OpenAiTool::BrowserSearch);
            request.tool_choice = Some(json!("auto"));
            let budget = options.max_completion_tokens.unwrap_or(GPT_OSS_MAX_COMPLETION_TOKENS);
            request.max_completion_tokens = Some(budget);
            request.max_tokens = None;
        }

        request
    }

    fn http_request(&self, options: &ChatOptions, body: &OpenAiRequest) -> Result<HttpRequest, LlmError> {
        let api_key = self.settings.api_key.as_ref().ok_or_else(|| LlmError::NotConfigured {
            provider: self.settings.name.clone(),
        })?;

        Ok(HttpRequest::post(
            endpoint(self.settings.base_url(options), "chat/completions"),
            serde_json::to_value(body)?,
        )
        .bearer(api_key.expose_secret())
        .timeout(self.settings.timeout))
    }

    async fn send(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<LlmResponse, LlmError> {
        let body = self.build_request(messages, tools, options, false);
        let request = self.http_request(options, &body)?;
        let bytes = self.transport.post_json(request).await?;
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
        let request = self.http_request(options, &body)?;
        let stream = self.transport.post_stream(request).await?;
        drive(sse_frames(stream), OpenAiStreamState::new(), on_chunk, None).await
    }
}

impl WireFormat for OpenAiCompatibleProvider {
    type Messages = Vec<OpenAiMessage>;
    type Tool = OpenAiTool;

    fn format_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        convert::format_messages(messages)
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        convert::format_tools(tools)
    }

    fn parse_response(&self, body: &[u8]) -> Result<LlmResponse, LlmError> {
        let (response, raw): (OpenAiResponse, Value) = decode_body(body)?;
        Ok(convert::parse_response(response, raw))
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn style(&self) -> ProviderStyle {
        ProviderStyle::OpenAi
    }

    async fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
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
