use url::Url;

use super::ToolChoice;

/// Per-call overrides; every field falls back to the provider's default
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Model identifier
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Maximum output tokens
    pub max_tokens: Option<u32>,
    /// Maximum completion tokens, for backends that budget reasoning separately
    pub max_completion_tokens: Option<u32>,
    /// Tool selection policy, only sent when tools are supplied
    pub tool_choice: Option<ToolChoice>,
    /// Base URL for this call only
    pub base_url: Option<Url>,
}

impl ChatOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}
