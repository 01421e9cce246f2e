use serde::Deserialize;

/// Log output configuration
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is unset
    #[serde(default)]
    pub filter: Option<String>,
    /// Log line format
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// Multi-line human readable output
    Pretty,
    /// Newline-delimited JSON objects
    Json,
}
