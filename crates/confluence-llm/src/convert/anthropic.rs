//! Conversion between canonical types and Anthropic wire format

use serde::Serialize;
use serde_json::Value;

use crate::decode::accumulate::{ToolCallAccumulator, arguments_from_value};
use crate::decode::{StreamDecoder, parse_frame};
use crate::protocol::anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicMessage, AnthropicResponse, AnthropicResponseBlock,
    AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool, AnthropicToolChoice,
    AnthropicUsage,
};
use crate::types::{
    FinishReason, LlmResponse, Message, Role, StreamEvent, ToolCall, ToolCallKey, ToolChoice, ToolDefinition, Usage,
};

/// Messages plus the system prompt Anthropic carries outside the list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicPrompt {
    /// All system turns joined with a blank line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Conversation turns, tool results folded into user turns
    pub messages: Vec<AnthropicMessage>,
}

// -- Outbound: canonical -> Anthropic --

/// Split system turns out and fold the rest into Anthropic turns
///
/// Tool results become `tool_result` blocks on a user turn, flagged with
/// `is_error` when the tool failed. Assistant tool calls become `tool_use`
/// blocks after any text.
pub fn format_messages(messages: &[Message]) -> AnthropicPrompt {
    let mut system: Option<String> = None;
    let mut formatted = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            Role::System => {
                let text = message.content_text();
                system = Some(match system {
                    Some(existing) => format!("{existing}\n\n{text}"),
                    None => text.to_owned(),
                });
            }
            Role::Tool => formatted.push(AnthropicMessage {
                role: "user".to_owned(),
                content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
                    tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                    content: message.content_text().to_owned(),
                    is_error: message.is_error.then_some(true),
                }]),
            }),
            Role::Assistant if message.tool_calls.is_some() => {
                let mut blocks = Vec::new();
                if !message.content_text().is_empty() {
                    blocks.push(AnthropicContentBlock::Text {
                        text: message.content_text().to_owned(),
                    });
                }
                blocks.extend(message.tool_calls().iter().map(|call| AnthropicContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: Value::Object(call.arguments.clone()),
                }));
                formatted.push(AnthropicMessage {
                    role: "assistant".to_owned(),
                    content: AnthropicContent::Blocks(blocks),
                });
            }
            Role::User | Role::Assistant => formatted.push(AnthropicMessage {
                role: message.role.as_str().to_owned(),
                content: AnthropicContent::Text(message.content_text().to_owned()),
            }),
        }
    }

    AnthropicPrompt {
        system: system.filter(|s| !s.is_empty()),
        messages: formatted,
    }
}

impl From<&ToolDefinition> for AnthropicTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.schema(),
        }
    }
}

/// Tool definitions in Anthropic's flat `input_schema` shape
pub fn format_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
    tools.iter().map(AnthropicTool::from).collect()
}

/// `None` has no Anthropic equivalent and is omitted
pub fn format_tool_choice(choice: &ToolChoice) -> Option<AnthropicToolChoice> {
    let (choice_type, name) = match choice {
        ToolChoice::Auto => ("auto", None),
        ToolChoice::Required => ("any", None),
        ToolChoice::Function(name) => ("tool", Some(name.clone())),
        ToolChoice::None => return None,
    };

    Some(AnthropicToolChoice {
        choice_type: choice_type.to_owned(),
        name,
    })
}

// -- Inbound: Anthropic -> canonical --

/// `tool_use` and `max_tokens` are special; anything else is a normal stop
pub fn map_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("tool_use") => FinishReason::ToolCalls,
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

impl From<AnthropicUsage> for Usage {
    fn from(usage: AnthropicUsage) -> Self {
        Self::new(usage.input_tokens, usage.output_tokens)
    }
}

/// Decode a whole `messages` response
///
/// Text blocks are concatenated in order and `tool_use` blocks become tool
/// calls. Thinking blocks are dropped. Usage stays absent when the body has none.
pub fn parse_response(response: AnthropicResponse, raw: Value) -> LlmResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            AnthropicResponseBlock::Text { text } => content.push_str(&text),
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, arguments_from_value(input)));
            }
            AnthropicResponseBlock::Other => {}
        }
    }

    crate::decode::accumulate::ensure_unique_ids(&mut tool_calls);

    LlmResponse {
        content,
        tool_calls,
        finish_reason: map_stop_reason(response.stop_reason.as_deref()),
        model: response.model,
        usage: response.usage.map(Usage::from),
        raw,
        error: None,
    }
}

// -- Stream conversion --

/// Content-block lifecycle state for one streamed message
#[derive(Debug, Default)]
pub(crate) struct AnthropicStreamState {
    tools: ToolCallAccumulator,
    /// Tool-use block currently open
    open_tool: Option<ToolCallKey>,
    usage: AnthropicUsage,
    done: bool,
}

impl AnthropicStreamState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn convert_event(&mut self, event: AnthropicStreamEvent) -> Vec<StreamEvent> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                let mut events = Vec::new();
                if let Some(model) = message.model {
                    events.push(StreamEvent::ModelInfo(model));
                }
                if let Some(usage) = message.usage {
                    self.usage = usage;
                    events.push(StreamEvent::Usage(usage.into()));
                }
                events
            }

            AnthropicStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                AnthropicStreamContentBlock::ToolUse { id, name } => {
                    let id = if id.is_empty() { ToolCall::generate_id() } else { id };
                    let key = ToolCallKey::Id(id);
                    self.tools.apply(key.clone(), None, Some(&name), None);
                    self.open_tool = Some(key.clone());
                    vec![StreamEvent::ToolCallDelta {
                        key,
                        name: Some(name),
                        arguments: None,
                    }]
                }
                AnthropicStreamContentBlock::Text { text } if !text.is_empty() => {
                    vec![StreamEvent::ContentDelta(text)]
                }
                AnthropicStreamContentBlock::Text { .. } | AnthropicStreamContentBlock::Other => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } => vec![StreamEvent::ContentDelta(text)],
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    let Some(key) = self.open_tool.clone() else {
                        return Vec::new();
                    };
                    self.tools.apply(key.clone(), None, None, Some(&partial_json));
                    vec![StreamEvent::ToolCallDelta {
                        key,
                        name: None,
                        arguments: Some(partial_json),
                    }]
                }
                AnthropicStreamDelta::Other => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockStop { .. } => self
                .open_tool
                .take()
                .and_then(|key| self.tools.complete(&key))
                .map(StreamEvent::ToolCallComplete)
                .into_iter()
                .collect(),

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                let mut events = Vec::new();
                if let Some(reason) = delta.stop_reason.as_deref() {
                    events.push(StreamEvent::Finish(map_stop_reason(Some(reason))));
                }
                if let Some(usage) = usage {
                    if usage.input_tokens > 0 {
                        self.usage.input_tokens = usage.input_tokens;
                    }
                    self.usage.output_tokens = usage.output_tokens;
                    events.push(StreamEvent::Usage(self.usage.into()));
                }
                events
            }

            AnthropicStreamEvent::MessageStop => {
                self.done = true;
                Vec::new()
            }

            AnthropicStreamEvent::Error { error } => {
                self.done = true;
                let message = if error.message.is_empty() { error.error_type } else { error.message };
                vec![StreamEvent::Failed(message)]
            }

            AnthropicStreamEvent::Ping | AnthropicStreamEvent::Unknown => Vec::new(),
        }
    }
}

impl StreamDecoder for AnthropicStreamState {
    fn decode(&mut self, frame: &str) -> Vec<StreamEvent> {
        parse_frame::<AnthropicStreamEvent>(frame).map_or_else(Vec::new, |event| self.convert_event(event))
    }

    /// A tool block left open by a truncated stream is still returned
    fn finish(&mut self) -> Vec<StreamEvent> {
        self.open_tool = None;
        self.tools.drain().into_iter().map(StreamEvent::ToolCallComplete).collect()
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
