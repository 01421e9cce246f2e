use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for a single LLM backend
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmProviderConfig {
    /// Backend identity
    #[serde(rename = "type")]
    pub provider_type: LlmProviderType,
    /// API key; falls back to the backend's fixed environment variable
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Model used when a request does not name one
    #[serde(default)]
    pub default_model: Option<String>,
    /// Request timeout (e.g. "60s", "2m")
    #[serde(default)]
    pub timeout: Option<String>,
    /// Catalog override for `models()`
    #[serde(default)]
    pub models: Vec<String>,
    /// Deployment mode, only meaningful for `ollama`
    #[serde(default)]
    pub mode: Option<OllamaMode>,
}

impl LlmProviderConfig {
    /// Parse the configured timeout, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is malformed or zero
    pub fn timeout(&self) -> anyhow::Result<Option<Duration>> {
        let Some(raw) = self.timeout.as_deref() else {
            return Ok(None);
        };

        let duration = duration_str::parse(raw).map_err(|e| anyhow::anyhow!("invalid timeout '{raw}': {e}"))?;

        if duration.is_zero() {
            anyhow::bail!("timeout must be greater than zero");
        }

        Ok(Some(duration))
    }
}

/// Supported backend identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderType {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI chat completions
    Openai,
    /// Groq (OpenAI-compatible, with browser search on gpt-oss models)
    Groq,
    /// Cerebras (OpenAI-compatible)
    Cerebras,
    /// Together AI (OpenAI-compatible)
    Together,
    /// Fireworks AI (OpenAI-compatible)
    Fireworks,
    /// Ollama native chat API
    Ollama,
}

impl LlmProviderType {
    /// Canonical identity name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Openai => "openai",
            Self::Groq => "groq",
            Self::Cerebras => "cerebras",
            Self::Together => "together",
            Self::Fireworks => "fireworks",
            Self::Ollama => "ollama",
        }
    }
}

/// Ollama deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OllamaMode {
    /// Local server, no credential, liveness probed
    Local,
    /// Hosted service, bearer credential required
    Cloud,
}
