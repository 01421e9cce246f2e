use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Message, ToolCall};

/// Why generation stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of output
    #[default]
    Stop,
    /// Output token budget exhausted
    Length,
    /// Model requested tool calls
    ToolCalls,
    /// Request failed
    Error,
}

impl FinishReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::Error => "error",
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Final result of one chat request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmResponse {
    /// Visible answer text
    pub content: String,
    /// Tool invocations, ids unique
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    /// Model that served the request, when reported
    pub model: Option<String>,
    pub usage: Option<Usage>,
    /// Backend-native body; `Null` for streamed and failed responses
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
    /// Failure message; set only on the error variant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LlmResponse {
    /// Error variant: every other field empty
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Error,
            model: None,
            usage: None,
            raw: Value::Null,
            error: Some(message.into()),
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.finish_reason, FinishReason::Error)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Assistant turn to append to the conversation history
    pub fn to_assistant_message(&self) -> Message {
        if self.has_tool_calls() {
            Message::assistant_with_tool_calls(self.content.clone(), self.tool_calls.clone())
        } else {
            Message::assistant(self.content.clone())
        }
    }
}
