//! Conversion between canonical types and the Ollama native chat format

use serde_json::Value;

use crate::decode::accumulate::arguments_from_value;
use crate::decode::{StreamDecoder, parse_frame};
use crate::protocol::ollama::{
    OllamaChatChunk, OllamaFunction, OllamaFunctionCall, OllamaMessage, OllamaOptions, OllamaTool, OllamaToolCall,
};
use crate::types::{ChatOptions, FinishReason, LlmResponse, Message, StreamEvent, ToolCall, ToolDefinition, Usage};

/// Channel name for `message.thinking` output
const THINKING_CHANNEL: &str = "thinking";

// -- Outbound: canonical -> Ollama --

impl From<&Message> for OllamaMessage {
    fn from(message: &Message) -> Self {
        let tool_calls = message
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: call.name.clone(),
                            arguments: Value::Object(call.arguments.clone()),
                        },
                    })
                    .collect()
            });

        Self {
            role: message.role.as_str().to_owned(),
            content: message.content_text().to_owned(),
            tool_calls,
        }
    }
}

/// Ollama turns; tool results carry no call ID
pub fn format_messages(messages: &[Message]) -> Vec<OllamaMessage> {
    messages.iter().map(OllamaMessage::from).collect()
}

/// Tool definitions with a default object schema
pub fn format_tools(tools: &[ToolDefinition]) -> Vec<OllamaTool> {
    tools
        .iter()
        .map(|tool| OllamaTool {
            tool_type: "function".to_owned(),
            function: OllamaFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.schema(),
            },
        })
        .collect()
}

/// Sampling options block, omitted entirely when nothing is set
pub fn build_options(options: &ChatOptions) -> Option<OllamaOptions> {
    let built = OllamaOptions {
        temperature: options.temperature,
        num_predict: options.max_tokens,
    };
    (built != OllamaOptions::default()).then_some(built)
}

// -- Inbound: Ollama -> canonical --

fn convert_tool_calls(calls: Vec<OllamaToolCall>) -> Vec<ToolCall> {
    calls
        .into_iter()
        .map(|call| {
            ToolCall::new(
                ToolCall::generate_id(),
                call.function.name,
                arguments_from_value(call.function.arguments),
            )
        })
        .collect()
}

fn usage_of(chunk: &OllamaChatChunk) -> Option<Usage> {
    if chunk.prompt_eval_count.is_none() && chunk.eval_count.is_none() {
        return None;
    }
    Some(Usage::new(
        chunk.prompt_eval_count.unwrap_or_default(),
        chunk.eval_count.unwrap_or_default(),
    ))
}

fn stopped_for_length(chunk: &OllamaChatChunk) -> bool {
    chunk.done_reason.as_deref() == Some("length")
}

/// Decode a non-streaming chat response
///
/// Tool calls arrive whole and get generated IDs. `fallback_model` is used
/// when the body names no model.
pub fn parse_response(response: OllamaChatChunk, raw: Value, fallback_model: &str) -> LlmResponse {
    let usage = usage_of(&response);
    let length = stopped_for_length(&response);
    let tool_calls = convert_tool_calls(response.message.tool_calls.unwrap_or_default());

    let finish_reason = if tool_calls.is_empty() {
        if response.done && !length { FinishReason::Stop } else { FinishReason::Length }
    } else {
        FinishReason::ToolCalls
    };

    LlmResponse {
        content: response.message.content.unwrap_or_default(),
        tool_calls,
        finish_reason,
        model: Some(response.model.unwrap_or_else(|| fallback_model.to_owned())),
        usage,
        raw,
        error: None,
    }
}

// -- Stream conversion --

/// Line-by-line state for one NDJSON chat stream
#[derive(Debug, Default)]
pub(crate) struct OllamaStreamState {
    saw_tool_calls: bool,
    done: bool,
}

impl OllamaStreamState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn convert_line(&mut self, line: OllamaChatChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(model) = line.model.clone() {
            events.push(StreamEvent::ModelInfo(model));
        }

        let usage = usage_of(&line);
        let length = stopped_for_length(&line);
        let message = line.message;

        if let Some(text) = message.thinking {
            events.push(StreamEvent::ReasoningDelta {
                text,
                channel: THINKING_CHANNEL.to_owned(),
            });
        }
        if let Some(text) = message.content {
            events.push(StreamEvent::ContentDelta(text));
        }
        if let Some(calls) = message.tool_calls {
            let calls = convert_tool_calls(calls);
            self.saw_tool_calls |= !calls.is_empty();
            events.extend(calls.into_iter().map(StreamEvent::ToolCallComplete));
        }

        if line.done {
            self.done = true;
            events.extend(usage.map(StreamEvent::Usage));
            let reason = if self.saw_tool_calls {
                FinishReason::ToolCalls
            } else if length {
                FinishReason::Length
            } else {
                FinishReason::Stop
            };
            events.push(StreamEvent::Finish(reason));
        }

        events
    }
}

impl StreamDecoder for OllamaStreamState {
    fn decode(&mut self, frame: &str) -> Vec<StreamEvent> {
        parse_frame::<OllamaChatChunk>(frame).map_or_else(Vec::new, |line| self.convert_line(line))
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::ToolArguments;

    #[test]
    fn messages_carry_arguments_as_objects() {
        let mut args = ToolArguments::new();
        args.insert("path".into(), json!("/tmp"));
        let wire = serde_json::to_value(format_messages(&[
            Message::user("list it"),
            Message::assistant_with_tool_calls("", vec![ToolCall::new("call_1", "ls", args)]),
            Message::tool_result("call_1", "a b"),
        ]))
        .unwrap();

        assert_eq!(
            wire,
            json!([
                {"role": "user", "content": "list it"},
                {"role": "assistant", "content": "", "tool_calls": [{"function": {"name": "ls", "arguments": {"path": "/tmp"}}}]},
                {"role": "tool", "content": "a b"}
            ])
        );
    }

    #[test]
    fn failed_tool_result_is_reported_in_content() {
        let wire = serde_json::to_value(format_messages(&[Message::tool_error("call_1", "no such dir")])).unwrap();
        assert_eq!(wire, json!([{"role": "tool", "content": r#"{"error":"no such dir"}"#}]));
    }

    #[test]
    fn tools_default_schema() {
        let tools = format_tools(&[ToolDefinition::new("ping", "", Value::Null)]);
        assert_eq!(
            serde_json::to_value(&tools).unwrap(),
            json!([{"type": "function", "function": {"name": "ping", "description": "", "parameters": {"type": "object", "properties": {}}}}])
        );
    }

    #[test]
    fn options_only_when_set() {
        assert!(build_options(&ChatOptions::default()).is_none());

        let options = ChatOptions {
            max_tokens: Some(64),
            ..ChatOptions::default()
        };
        assert_eq!(
            build_options(&options),
            Some(OllamaOptions {
                temperature: None,
                num_predict: Some(64)
            })
        );
    }

    #[test]
    fn whole_response_finish_and_usage() {
        let raw = json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "hi"},
            "done": true,
            "prompt_eval_count": 10,
            "eval_count": 2
        });
        let response = parse_response(serde_json::from_value(raw.clone()).unwrap(), raw, "fallback");
        assert_eq!(response.content, "hi");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage, Some(Usage::new(10, 2)));
        assert_eq!(response.model.as_deref(), Some("llama3.2"));

        let raw = json!({"message": {"content": "partial"}, "done": false});
        let response = parse_response(serde_json::from_value(raw.clone()).unwrap(), raw, "fallback");
        assert_eq!(response.finish_reason, FinishReason::Length);
        assert_eq!(response.model.as_deref(), Some("fallback"));
        assert!(response.usage.is_none());
    }

    #[test]
    fn whole_response_tool_calls_get_ids() {
        let raw = json!({
            "message": {"content": "", "tool_calls": [
                {"function": {"name": "a", "arguments": {"x": 1}}},
                {"function": {"name": "b", "arguments": {}}}
            ]},
            "done": true
        });
        let response = parse_response(serde_json::from_value(raw.clone()).unwrap(), raw, "m");
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 2);
        assert!(response.tool_calls.iter().all(|c| c.id.starts_with("call_")));
        assert_ne!(response.tool_calls[0].id, response.tool_calls[1].id);
    }

    #[test]
    fn stream_lines_to_events() {
        let mut state = OllamaStreamState::new();

        let events = state.decode(r#"{"model":"qwen3","message":{"role":"assistant","content":"","thinking":"hmm"},"done":false}"#);
        assert_eq!(
            events,
            [
                StreamEvent::ModelInfo("qwen3".into()),
                StreamEvent::ReasoningDelta {
                    text: "hmm".into(),
                    channel: "thinking".into()
                },
                StreamEvent::ContentDelta(String::new()),
            ]
        );

        let events = state.decode(r#"{"model":"qwen3","message":{"role":"assistant","content":"Hi"},"done":false}"#);
        assert_eq!(events[1], StreamEvent::ContentDelta("Hi".into()));
        assert!(!state.is_done());

        let events = state.decode(r#"{"model":"qwen3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","prompt_eval_count":4,"eval_count":9}"#);
        assert!(events.contains(&StreamEvent::Usage(Usage::new(4, 9))));
        assert_eq!(events.last(), Some(&StreamEvent::Finish(FinishReason::Stop)));
        assert!(state.is_done());
    }

    #[test]
    fn stream_tool_calls_complete_immediately() {
        let mut state = OllamaStreamState::new();
        let events = state.decode(r#"{"message":{"content":"","tool_calls":[{"function":{"name":"ls","arguments":{"path":"/"}}}]},"done":false}"#);
        let StreamEvent::ToolCallComplete(call) = &events[1] else {
            panic!("expected tool call, got {events:?}");
        };
        assert_eq!(call.name, "ls");
        assert_eq!(json!(call.arguments), json!({"path": "/"}));

        let events = state.decode(r#"{"message":{"content":""},"done":true}"#);
        assert_eq!(events.last(), Some(&StreamEvent::Finish(FinishReason::ToolCalls)));
    }

    #[test]
    fn stream_length_stop() {
        let mut state = OllamaStreamState::new();
        let events = state.decode(r#"{"message":{"content":"x"},"done":true,"done_reason":"length"}"#);
        assert_eq!(events.last(), Some(&StreamEvent::Finish(FinishReason::Length)));
    }

    #[test]
    fn garbage_line_is_skipped() {
        let mut state = OllamaStreamState::new();
        assert!(state.decode("not json").is_empty());
        assert!(!state.is_done());
    }
}
