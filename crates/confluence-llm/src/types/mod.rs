//! Canonical, backend-agnostic chat types
//!
//! Every adapter converts its wire format to and from these.

pub mod message;
pub mod options;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Message, Role, ToolArguments, ToolCall, ToolResult};
pub use options::ChatOptions;
pub use response::{FinishReason, LlmResponse, Usage};
pub(crate) use stream::StreamEvent;
pub use stream::{ActivityEvent, ActivityKind, SideEvent, ToolCallKey, WebActivity};
pub use tool::{ToolChoice, ToolDefinition};
