//! Streaming chat gateway over multiple LLM backends
//!
//! One canonical request ([`Message`], [`ToolDefinition`], [`ChatOptions`]) and
//! one canonical result ([`LlmResponse`]) across the Anthropic Messages API, the
//! OpenAI-compatible family (`OpenAI`, Groq, Cerebras, Together, Fireworks) and
//! Ollama's native NDJSON chat API.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub(crate) mod decode;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod transport;
pub mod types;

pub use decode::accumulate::{ToolCallAccumulator, parse_arguments};
pub use decode::lines::LineSplitter;
pub use error::{LlmError, TransportError};
pub use provider::anthropic::AnthropicProvider;
pub use provider::ollama::OllamaProvider;
pub use provider::openai::{OpenAiBackend, OpenAiCompatibleProvider};
pub use provider::{ChunkCallback, Provider, ProviderSettings, ProviderStyle, WireFormat};
pub use registry::{ProviderRegistry, build_provider, create, resolve_alias};
pub use transport::{HttpRequest, HttpTransport, ReqwestTransport};
pub use types::{
    ActivityEvent, ChatOptions, FinishReason, LlmResponse, Message, Role, SideEvent, ToolCall, ToolChoice,
    ToolDefinition, ToolResult, Usage, WebActivity,
};
