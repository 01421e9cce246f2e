//! Conversion between canonical types and each backend's wire format
//!
//! Each submodule also holds the streaming state machine for its backend.

pub mod anthropic;
pub mod ollama;
pub mod openai;
