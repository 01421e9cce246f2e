//! OpenAI chat completions wire format types
//!
//! Shared by every OpenAI-compatible backend. Groq's `reasoning`,
//! `executed_tools` and `x_groq` extensions are modelled as optional fields.

use serde::{Deserialize, Serialize};

// -- Request types --

/// Chat completions request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OpenAiMessage>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Output token budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Completion token budget, including reasoning and server-side tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,
    /// `"auto"`, `"required"`, `"none"` or a named function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    /// Whether to stream the response
    pub stream: bool,
}

/// Message in a chat completions request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiMessage {
    /// Role ("system", "user", "assistant", "tool")
    pub role: String,
    /// Text content; absent on tool-call-only assistant turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
    /// Tool call ID this message responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool entry in a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAiTool {
    /// Caller-defined function
    Function { function: OpenAiFunction },
    /// Groq server-side browser search
    BrowserSearch,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiFunction {
    /// Function name the model calls
    pub name: String,
    /// What the function does, shown to the model
    pub description: String,
    /// JSON Schema for the function parameters
    pub parameters: serde_json::Value,
}

/// Tool call in an outgoing assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    /// Call ID echoed back by the matching tool message
    pub id: String,
    /// Always "function"
    #[serde(rename = "type")]
    pub call_type: String,
    /// Called function
    pub function: OpenAiFunctionCall,
}

/// Function name and JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiFunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments string
    pub arguments: String,
}

// -- Response types --

/// Chat completions response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiResponse {
    /// Model that served the request
    #[serde(default)]
    pub model: Option<String>,
    /// Completion choices; only the first is used
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
    /// Groq: server-side tool executions reported at top level
    #[serde(default)]
    pub executed_tools: Option<Vec<ExecutedTool>>,
    /// Groq: reasoning reported at top level
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A single completion choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiChoice {
    /// Assistant output
    #[serde(default)]
    pub message: OpenAiChoiceMessage,
    /// Raw finish reason, e.g. "stop" or "tool_calls"
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message inside a choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiChoiceMessage {
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// Requested tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiResponseToolCall>>,
    /// Groq: model reasoning
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Groq: server-side tool executions
    #[serde(default)]
    pub executed_tools: Option<Vec<ExecutedTool>>,
}

/// Tool call in a response; some backends send arguments as an object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiResponseToolCall {
    /// Call ID; generated when missing
    #[serde(default)]
    pub id: Option<String>,
    /// Called function
    pub function: OpenAiResponseFunction,
}

/// Function call in a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiResponseFunction {
    /// Function name
    #[serde(default)]
    pub name: String,
    /// JSON-encoded string or object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OpenAiUsage {
    /// Input tokens
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Output tokens
    #[serde(default)]
    pub completion_tokens: u32,
    /// Input plus output
    #[serde(default)]
    pub total_tokens: u32,
}

/// Groq server-side tool execution
///
/// Streaming deltas use `name` (`browser.search`, `browser.open`), whole
/// responses may use `type` (`browser_search`, `browser_open`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutedTool {
    /// Dotted tool name, streaming form
    #[serde(default)]
    pub name: Option<String>,
    /// Underscored tool name, whole-response form
    #[serde(default, rename = "type")]
    pub tool_type: Option<String>,
    /// JSON-encoded arguments, e.g. `{"query":"..."}`
    #[serde(default)]
    pub arguments: Option<String>,
    /// Populated once the execution has finished
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    /// Results of a search execution
    #[serde(default)]
    pub search_results: Option<SearchResults>,
    /// Search query, when not inside `arguments`
    #[serde(default)]
    pub query: Option<String>,
    /// Opened page, when not inside `arguments`
    #[serde(default)]
    pub url: Option<String>,
}

/// Results attached to a browser tool execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Result list in rank order
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// One browser result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result URL
    #[serde(default)]
    pub url: Option<String>,
    /// Page title
    #[serde(default)]
    pub title: Option<String>,
}

// -- Streaming types --

/// Streaming chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamChunk {
    /// Model that served the request
    #[serde(default)]
    pub model: Option<String>,
    /// Usually one choice; empty on usage-only chunks
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
    /// Usage (final chunk, when requested)
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
    /// Groq reports usage here on the final chunk
    #[serde(default)]
    pub x_groq: Option<GroqChunkMetadata>,
}

/// Groq chunk metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroqChunkMetadata {
    /// Token usage for the whole stream
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

/// A streaming choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamChoice {
    /// Incremental output
    #[serde(default)]
    pub delta: OpenAiStreamDelta,
    /// Set on the last chunk of the choice
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental delta in a streaming choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamDelta {
    /// Text fragment
    #[serde(default)]
    pub content: Option<String>,
    /// Tool call fragments keyed by `index`
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiStreamToolCall>>,
    /// Groq reasoning fragment
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Reasoning fragment under the name other backends use
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Reasoning channel name, when the backend labels it
    #[serde(default)]
    pub channel: Option<String>,
    /// Groq server-side tool progress
    #[serde(default)]
    pub executed_tools: Option<Vec<ExecutedTool>>,
}

/// Partial tool call in a streaming delta
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamToolCall {
    /// Slot this fragment belongs to
    #[serde(default)]
    pub index: u32,
    /// Tool call ID (first fragment only)
    #[serde(default)]
    pub id: Option<String>,
    /// Name and argument fragments
    #[serde(default)]
    pub function: Option<OpenAiStreamFunctionCall>,
}

/// Partial function call in a streaming tool call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamFunctionCall {
    /// Function name (first fragment only)
    #[serde(default)]
    pub name: Option<String>,
    /// Next slice of the JSON arguments string
    #[serde(default)]
    pub arguments: Option<String>,
}
