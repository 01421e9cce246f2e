//! Named provider instances built from configuration

use std::sync::Arc;

use confluence_config::{Config, LlmProviderConfig, LlmProviderType};
use indexmap::IndexMap;

use crate::error::LlmError;
use crate::provider::anthropic::{self, AnthropicProvider};
use crate::provider::ollama::{self, OllamaProvider};
use crate::provider::openai::{OpenAiBackend, OpenAiCompatibleProvider};
use crate::provider::{DEFAULT_TIMEOUT, Provider, ProviderSettings};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Every backend identity with a built-in adapter
pub const KNOWN_PROVIDERS: [&str; 7] = ["anthropic", "openai", "groq", "cerebras", "together", "fireworks", "ollama"];

/// Identities tried first by [`ProviderRegistry::auto_detect`]
const DETECT_PRIORITY: [&str; 5] = ["groq", "openai", "anthropic", "together", "fireworks"];

/// Canonical identity for a shorthand name; unknown names pass through lowercased
pub fn resolve_alias(name: &str) -> String {
    let name = name.to_ascii_lowercase();
    let resolved = match name.as_str() {
        "claude" => "anthropic",
        "gpt" | "gpt-4" | "gpt-4o" => "openai",
        "llama" | "llama-3" | "mixtral" => "groq",
        _ => return name,
    };
    resolved.to_owned()
}

/// Default adapter for a known identity (or alias), reading its credential from the environment
pub fn create(name: &str, transport: Arc<dyn HttpTransport>) -> Result<Arc<dyn Provider>, LlmError> {
    let identity = resolve_alias(name);

    let provider: Arc<dyn Provider> = match identity.as_str() {
        "anthropic" => Arc::new(AnthropicProvider::from_env(transport)),
        "ollama" => Arc::new(OllamaProvider::from_env(transport)),
        other => match OpenAiBackend::from_name(other) {
            Some(backend) => Arc::new(OpenAiCompatibleProvider::from_env(backend, transport)),
            None => return Err(LlmError::UnknownProvider { name: name.to_owned() }),
        },
    };

    Ok(provider)
}

/// Adapter for one config entry, with its own `reqwest` transport
pub fn build_provider(name: &str, config: &LlmProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
    let default_timeout = match config.provider_type {
        LlmProviderType::Ollama => ollama::DEFAULT_TIMEOUT,
        _ => DEFAULT_TIMEOUT,
    };
    let timeout = config.timeout().ok().flatten().unwrap_or(default_timeout);
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(timeout)?);

    Ok(build_with_transport(name, config, transport))
}

fn build_with_transport(
    name: &str,
    config: &LlmProviderConfig,
    transport: Arc<dyn HttpTransport>,
) -> Arc<dyn Provider> {
    let backend = match config.provider_type {
        LlmProviderType::Anthropic => {
            let settings = ProviderSettings::from_config(name, config, &anthropic::DEFAULTS);
            return Arc::new(AnthropicProvider::new(settings, transport));
        }
        LlmProviderType::Ollama => return Arc::new(OllamaProvider::from_config(name, config, transport)),
        LlmProviderType::Openai => OpenAiBackend::OpenAi,
        LlmProviderType::Groq => OpenAiBackend::Groq,
        LlmProviderType::Cerebras => OpenAiBackend::Cerebras,
        LlmProviderType::Together => OpenAiBackend::Together,
        LlmProviderType::Fireworks => OpenAiBackend::Fireworks,
    };

    let settings = ProviderSettings::from_config(name, config, backend.defaults());
    Arc::new(OpenAiCompatibleProvider::new(backend, settings, transport))
}

struct Entry {
    /// Backend identity, used for detection priority
    identity: String,
    provider: Arc<dyn Provider>,
}

/// Providers in registration order, looked up by name or alias
#[derive(Default)]
pub struct ProviderRegistry {
    entries: IndexMap<String, Entry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One adapter per configured provider, in declaration order
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let mut registry = Self::new();

        for (name, provider_config) in &config.providers {
            let provider = build_provider(name, provider_config)?;
            tracing::debug!(provider = %name, kind = provider_config.provider_type.as_str(), "registered provider");
            registry.insert(provider_config.provider_type.as_str(), provider);
        }

        Ok(registry)
    }

    /// Default adapters for every known identity over a shared transport
    pub fn with_defaults(transport: Arc<dyn HttpTransport>) -> Result<Self, LlmError> {
        let mut registry = Self::new();
        for name in KNOWN_PROVIDERS {
            registry.register(create(name, Arc::clone(&transport))?);
        }
        Ok(registry)
    }

    /// Add or replace a provider under its own name
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let identity = provider.name().to_owned();
        self.insert(&identity, provider);
    }

    fn insert(&mut self, identity: &str, provider: Arc<dyn Provider>) {
        let name = provider.name().to_owned();
        self.entries.insert(
            name,
            Entry {
                identity: identity.to_owned(),
                provider,
            },
        );
    }

    /// Provider registered as `name`, else the one registered under its alias target
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(resolve_alias(name).as_str()))
            .map(|entry| Arc::clone(&entry.provider))
    }

    /// Like [`Self::get`] but reports unknown names
    pub fn require(&self, name: &str) -> Result<Arc<dyn Provider>, LlmError> {
        self.get(name).ok_or_else(|| LlmError::UnknownProvider { name: name.to_owned() })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.entries.values().map(|entry| &entry.provider)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First configured provider: priority identities first, then registration order
    pub async fn auto_detect(&self) -> Option<Arc<dyn Provider>> {
        let rank = |entry: &Entry| {
            DETECT_PRIORITY
                .iter()
                .position(|identity| *identity == entry.identity)
                .unwrap_or(DETECT_PRIORITY.len())
        };

        let mut candidates: Vec<&Entry> = self.entries.values().collect();
        candidates.sort_by_key(|entry| rank(entry));

        for entry in candidates {
            if entry.provider.is_configured().await {
                tracing::debug!(provider = %entry.provider.name(), "auto-detected provider");
                return Some(Arc::clone(&entry.provider));
            }
        }

        None
    }
}
