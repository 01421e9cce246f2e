//! Anthropic Messages API provider implementation

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;

use super::{
    ChunkCallback, DEFAULT_TIMEOUT, Provider, ProviderDefaults, ProviderSettings, ProviderStyle, WireFormat,
    decode_body, endpoint, finish_request,
};
use crate::convert::anthropic::{self as convert, AnthropicPrompt, AnthropicStreamState};
use crate::decode::{drive, sse_frames};
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse, AnthropicTool};
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::{ChatOptions, LlmResponse, Message, ToolDefinition};

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` is mandatory on this API
const DEFAULT_MAX_TOKENS: u32 = 2000;

pub const DEFAULTS: ProviderDefaults = ProviderDefaults {
    name: "anthropic",
    api_key_env: "ANTHROPIC_API_KEY",
    base_url: "https://api.anthropic.com/v1/",
    default_model: "claude-sonnet-4-20250514",
    models: &[
        "claude-sonnet-4-20250514",
        "claude-3-5-sonnet-20241022",
        "claude-3-5-haiku-20241022",
        "claude-3-opus-20240229",
        "claude-3-sonnet-20240229",
        "claude-3-haiku-20240307",
    ],
    timeout: DEFAULT_TIMEOUT,
};

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    settings: ProviderSettings,
    transport: Arc<dyn HttpTransport>,
}

impl AnthropicProvider {
    pub fn new(settings: ProviderSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self { settings, transport }
    }

    /// Provider with default settings and the `ANTHROPIC_API_KEY` credential
    pub fn from_env(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(ProviderSettings::from_defaults(&DEFAULTS), transport)
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ChatOptions,
        stream: bool,
    ) -> AnthropicRequest {
        let AnthropicPrompt { system, messages } = self.format_messages(messages);

        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (
                Some(self.format_tools(tools)),
                options.tool_choice.as_ref().and_then(convert::format_tool_choice),
            )
        };

        AnthropicRequest {
            model: self.settings.model(options),
            messages,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            tools,
            tool_choice,
            temperature: options.temperature,
            stream: stream.then_some(true),
        }
    }

    fn http_request(&self, options: &ChatOptions, body: &AnthropicRequest) -> Result<HttpRequest, LlmError> {
        let api_key = self.settings.api_key.as_ref().ok_or_else(|| LlmError::NotConfigured {
            provider: self.settings.name.clone(),
        })?;

        Ok(
            HttpRequest::post(endpoint(self.settings.base_url(options), "messages"), serde_json::to_value(body)?)
                .header("x-api-key", api_key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .timeout(self.settings.timeout),
        )
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
        let model = body.model.clone();
        let request = self.http_request(options, &body)?;
        let stream = self.transport.post_stream(request).await?;
        drive(sse_frames(stream), AnthropicStreamState::new(), on_chunk, Some(model)).await
    }
}

impl WireFormat for AnthropicProvider {
    type Messages = AnthropicPrompt;
    type Tool = AnthropicTool;

    fn format_messages(&self, messages: &[Message]) -> AnthropicPrompt {
        convert::format_messages(messages)
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        convert::format_tools(tools)
    }

    fn parse_response(&self, body: &[u8]) -> Result<LlmResponse, LlmError> {
        let (response, raw): (AnthropicResponse, Value) = decode_body(body)?;
        Ok(convert::parse_response(response, raw))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn style(&self) -> ProviderStyle {
        ProviderStyle::Anthropic
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
