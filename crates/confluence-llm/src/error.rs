use serde_json::Value;
use thiserror::Error;

use crate::types::LlmResponse;

/// Failure talking to a backend over HTTP
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, TLS or request construction failed
    #[error("request failed: {0}")]
    Request(String),

    /// Backend answered with a non-2xx status
    #[error("API error ({status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// Request exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Reading the response body failed mid-way
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Build a status error, extracting the backend's message from a JSON body
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            message: extract_error_message(body).unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.to_owned()
                }
            }),
        }
    }
}

/// Pull `error.message`, `message` or a string `error` out of a JSON error body
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    let candidate = value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))?;

    candidate.as_str().map(str::to_owned)
}

/// Errors raised while building, sending or parsing a chat request
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP layer failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A complete response body could not be decoded
    #[error("invalid response: {0}")]
    Protocol(String),

    /// Request payload could not be encoded
    #[error("failed to encode request: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Provider has no credential
    #[error("provider not configured: {provider}")]
    NotConfigured { provider: String },

    /// No adapter exists for the requested name
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },
}

impl LlmError {
    /// Convert into the error variant of [`LlmResponse`]
    pub fn into_response(self) -> LlmResponse {
        LlmResponse::error(self.to_string())
    }
}
