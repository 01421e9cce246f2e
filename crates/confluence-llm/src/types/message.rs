use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded tool-call arguments
pub type ToolArguments = Map<String, Value>;

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
    /// Result of a tool invocation
    Tool,
}

impl Role {
    /// Wire name shared by every backend
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the turn
    pub role: Role,
    /// Text content; may be absent on assistant turns that only call tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool invocations requested by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Call this tool-role message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on tool-role messages reporting a failed invocation
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that requested tool calls
    ///
    /// Empty content is stored as absent.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let content = content.into();
        Self {
            role: Role::Assistant,
            content: (!content.is_empty()).then_some(content),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            is_error: false,
        }
    }

    /// Tool output answering `tool_call_id`
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            is_error: false,
        }
    }

    /// Tool output given as JSON, encoded compactly unless it is already a string
    pub fn tool_result_json(tool_call_id: impl Into<String>, result: &Value) -> Self {
        Self::tool_result(tool_call_id, ToolResult::encode(result))
    }

    /// Failed tool invocation; content becomes `{"error": <message>}`
    pub fn tool_error(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        ToolResult::error(tool_call_id, error).into()
    }

    /// Content text, empty when absent
    pub fn content_text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Tool calls, empty when absent
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// Outcome of running a tool, ready to be fed back as a conversation turn
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub result: Value,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, result: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result,
            is_error: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result: serde_json::json!({ "error": message.into() }),
            is_error: true,
        }
    }

    /// Result as message content
    pub fn content(&self) -> String {
        Self::encode(&self.result)
    }

    fn encode(result: &Value) -> String {
        match result {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ToolResult> for Message {
    fn from(result: ToolResult) -> Self {
        let content = result.content();
        let mut message = Self::tool_result(result.tool_call_id, content);
        message.is_error = result.is_error;
        message
    }
}

/// A complete tool invocation with decoded arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, unique within one response
    pub id: String,
    /// Tool name
    pub name: String,
    /// Decoded arguments
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Arguments re-encoded as a JSON object string
    pub fn arguments_json(&self) -> String {
        Value::Object(self.arguments.clone()).to_string()
    }

    /// Generate a fresh `call_<uuid>` identifier
    pub fn generate_id() -> String {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    }
}
