use serde::Serialize;

use super::{FinishReason, ToolCall, Usage};

/// How a backend identifies the tool call a fragment belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolCallKey {
    /// Positional slot (OpenAI-compatible deltas)
    Index(u32),
    /// Explicit call id (Anthropic content blocks)
    Id(String),
}

impl ToolCallKey {
    pub const fn index(&self) -> Option<u32> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Id(_) => None,
        }
    }
}

/// Out-of-band activity family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Server-side web search or page read
    WebSearch,
}

/// A server-side web action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebActivity {
    /// A search query was issued
    Search { query: String },
    /// A page was opened
    Read { url: String, domain: String },
}

/// A completed server-side action worth showing to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEvent {
    #[serde(rename = "activity")]
    pub kind: ActivityKind,
    #[serde(flatten)]
    pub detail: WebActivity,
}

impl ActivityEvent {
    pub fn web_search(query: impl Into<String>) -> Self {
        Self {
            kind: ActivityKind::WebSearch,
            detail: WebActivity::Search { query: query.into() },
        }
    }

    pub fn web_read(url: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            kind: ActivityKind::WebSearch,
            detail: WebActivity::Read {
                url: url.into(),
                domain: domain.into(),
            },
        }
    }

    /// Sub-kind name (`search` or `read`)
    pub const fn action(&self) -> &'static str {
        match self.detail {
            WebActivity::Search { .. } => "search",
            WebActivity::Read { .. } => "read",
        }
    }
}

/// Side-channel payload handed to the streaming callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SideEvent {
    /// Model deliberation, never part of the visible answer
    Reasoning { text: String, channel: String },
    /// A tool call finished assembling
    ToolCall(ToolCall),
    /// Server-side activity
    Activity(ActivityEvent),
}

/// Normalized incremental notification produced by a stream decoder
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StreamEvent {
    ContentDelta(String),
    ReasoningDelta {
        text: String,
        channel: String,
    },
    ToolCallDelta {
        key: ToolCallKey,
        name: Option<String>,
        arguments: Option<String>,
    },
    ToolCallComplete(ToolCall),
    Activity(ActivityEvent),
    ModelInfo(String),
    Usage(Usage),
    Finish(FinishReason),
    /// Backend reported an in-stream error
    Failed(String),
}
