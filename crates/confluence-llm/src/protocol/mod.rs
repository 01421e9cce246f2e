//! Wire format types for each backend
//!
//! Plain serde types with no behavior; conversion lives in `convert`.

pub mod anthropic;
pub mod ollama;
pub mod openai;
