//! Ollama native chat API wire format types

use serde::{Deserialize, Serialize};

/// `POST api/chat` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaRequest {
    /// Installed model tag, e.g. `llama3.2:latest`
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OllamaMessage>,
    /// NDJSON lines when true, one object otherwise
    pub stream: bool,
    /// Sampling options; omitted when nothing is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OllamaTool>>,
}

/// Sampling options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OllamaOptions {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Output token budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Role ("system", "user", "assistant", "tool")
    pub role: String,
    /// Text content, empty on tool-call-only turns
    #[serde(default)]
    pub content: String,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OllamaToolCall>>,
}

/// Tool declaration, same nesting as OpenAI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaTool {
    /// Always "function"
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Declared function
    pub function: OllamaFunction,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunction {
    /// Function name
    pub name: String,
    /// What the function does
    pub description: String,
    /// JSON Schema for the function parameters
    pub parameters: serde_json::Value,
}

/// A whole tool call; Ollama never splits these across lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaToolCall {
    /// Called function
    pub function: OllamaFunctionCall,
}

/// Function name and arguments object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    /// Function name
    #[serde(default)]
    pub name: String,
    /// Arguments as a JSON object, never a string
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One NDJSON line, or the whole non-streaming response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaChatChunk {
    /// Model that served the request
    #[serde(default)]
    pub model: Option<String>,
    /// Output carried by this line
    #[serde(default)]
    pub message: OllamaResponseMessage,
    /// Set on the final line
    #[serde(default)]
    pub done: bool,
    /// "stop", "length", ...
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Input tokens (final line only)
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    /// Output tokens (final line only)
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// Message part of a chat line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaResponseMessage {
    /// Text fragment
    #[serde(default)]
    pub content: Option<String>,
    /// Reasoning output from thinking models
    #[serde(default)]
    pub thinking: Option<String>,
    /// Complete tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<OllamaToolCall>>,
}

/// `GET api/tags` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaTagList {
    /// Installed models
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

/// Installed model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaTag {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Model tag used in requests
    #[serde(default)]
    pub model: Option<String>,
}
