#![allow(clippy::must_use_candidate)]

mod env;
pub mod llm;
mod loader;
pub mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;

pub use llm::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level Confluence configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Log output configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// LLM backends keyed by registry name, in declaration order
    #[serde(default)]
    pub providers: IndexMap<String, LlmProviderConfig>,
}
