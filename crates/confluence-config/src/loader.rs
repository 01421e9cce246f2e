use std::path::Path;

use crate::{Config, LlmProviderType};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, expansion or parsing
    /// fails, or validation rejects the result
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml_str(&raw)
    }

    /// Parse configuration from in-memory TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        tracing::debug!(providers = config.providers.len(), "configuration loaded");

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending provider
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, provider) in &self.providers {
            if name.trim().is_empty() {
                anyhow::bail!("provider names must not be empty");
            }

            provider
                .timeout()
                .map_err(|e| anyhow::anyhow!("provider '{name}': {e}"))?;

            if provider.mode.is_some() && provider.provider_type != LlmProviderType::Ollama {
                anyhow::bail!("provider '{name}': `mode` is only supported for ollama providers");
            }

            if provider.default_model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                anyhow::bail!("provider '{name}': `default_model` must not be empty");
            }
        }

        Ok(())
    }
}
