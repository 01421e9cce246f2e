//! Folding stream events into the final response

use serde_json::Value;

use super::accumulate::ensure_unique_ids;
use crate::types::{FinishReason, LlmResponse, SideEvent, StreamEvent, ToolCall, Usage};

/// Applies decoded events in order, forwarding increments to the caller
pub(crate) struct ResponseBuilder<F> {
    on_chunk: F,
    content: String,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<FinishReason>,
    model: Option<String>,
    usage: Option<Usage>,
    failure: Option<String>,
}

impl<F> ResponseBuilder<F>
where
    F: FnMut(&str, Option<&SideEvent>),
{
    pub(crate) const fn new(on_chunk: F, model: Option<String>) -> Self {
        Self {
            on_chunk,
            content: String::new(),
            tool_calls: Vec::new(),
            finish_reason: None,
            model,
            usage: None,
            failure: None,
        }
    }

    pub(crate) fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::ContentDelta(text) => {
                if text.is_empty() {
                    return;
                }
                self.content.push_str(&text);
                (self.on_chunk)(&text, None);
            }
            StreamEvent::ReasoningDelta { text, channel } => {
                if text.is_empty() {
                    return;
                }
                (self.on_chunk)("", Some(&SideEvent::Reasoning { text, channel }));
            }
            StreamEvent::ToolCallDelta { key, name, arguments } => {
                tracing::trace!(?key, name = ?name, arguments = ?arguments, "tool call fragment");
            }
            StreamEvent::ToolCallComplete(call) => {
                let event = SideEvent::ToolCall(call);
                (self.on_chunk)("", Some(&event));
                if let SideEvent::ToolCall(call) = event {
                    self.tool_calls.push(call);
                }
            }
            StreamEvent::Activity(activity) => {
                (self.on_chunk)("", Some(&SideEvent::Activity(activity)));
            }
            StreamEvent::ModelInfo(model) => self.model = Some(model),
            StreamEvent::Usage(usage) => self.usage = Some(usage),
            StreamEvent::Finish(reason) => self.finish_reason = Some(reason),
            StreamEvent::Failed(message) => self.failure = Some(message),
        }
    }

    pub(crate) fn apply_all(&mut self, events: impl IntoIterator<Item = StreamEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    pub(crate) fn finish(self) -> LlmResponse {
        if let Some(message) = self.failure {
            return LlmResponse::error(message);
        }

        let mut tool_calls = self.tool_calls;
        ensure_unique_ids(&mut tool_calls);

        LlmResponse {
            content: self.content,
            tool_calls,
            finish_reason: self.finish_reason.unwrap_or_default(),
            model: self.model,
            usage: self.usage,
            raw: Value::Null,
            error: None,
        }
    }
}
