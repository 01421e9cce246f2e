//! Conversion between canonical types and OpenAI chat completions format

use serde_json::{Value, json};
use url::Url;

use crate::decode::accumulate::{ToolCallAccumulator, arguments_from_value, ensure_unique_ids, parse_arguments};
use crate::decode::{StreamDecoder, parse_frame};
use crate::protocol::openai::{
    ExecutedTool, OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiResponse, OpenAiStreamChunk, OpenAiTool,
    OpenAiToolCall, OpenAiUsage,
};
use crate::types::{
    ActivityEvent, FinishReason, LlmResponse, Message, Role, StreamEvent, ToolCall, ToolCallKey, ToolChoice,
    ToolDefinition, Usage,
};

/// Reasoning channel assumed when a delta does not name one
const DEFAULT_REASONING_CHANNEL: &str = "analysis";

/// Maximum sources listed in the web search summary line
const MAX_LISTED_SOURCES: usize = 5;

// -- Outbound: canonical -> OpenAI --

impl From<&ToolCall> for OpenAiToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            call_type: "function".to_owned(),
            function: OpenAiFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments_json(),
            },
        }
    }
}

impl From<&Message> for OpenAiMessage {
    fn from(message: &Message) -> Self {
        let tool_calls = message
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .map(|calls| calls.iter().map(OpenAiToolCall::from).collect());

        Self {
            role: message.role.as_str().to_owned(),
            content: message.content.clone(),
            tool_calls,
            tool_call_id: match message.role {
                Role::Tool => message.tool_call_id.clone(),
                _ => None,
            },
        }
    }
}

/// Flat OpenAI messages; `tool_call_id` is only kept on tool turns
pub fn format_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
    messages.iter().map(OpenAiMessage::from).collect()
}

impl From<&ToolDefinition> for OpenAiTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self::Function {
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.schema(),
            },
        }
    }
}

pub fn format_tools(tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
    tools.iter().map(OpenAiTool::from).collect()
}

pub fn format_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Function(name) => json!({"type": "function", "function": {"name": name}}),
    }
}

// -- Inbound: OpenAI -> canonical --

pub fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("tool_calls" | "function_call") => FinishReason::ToolCalls,
        Some("length") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        let mut converted = Self::new(usage.prompt_tokens, usage.completion_tokens);
        if usage.total_tokens > 0 {
            converted.total_tokens = usage.total_tokens;
        }
        converted
    }
}

/// Host part of `url`, or the whole string when it does not parse
fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

fn is_search(tool: &ExecutedTool) -> bool {
    matches!(tool.name.as_deref(), Some("browser.search"))
        || matches!(tool.tool_type.as_deref(), Some("browser_search" | "browser.search"))
}

fn is_open(tool: &ExecutedTool) -> bool {
    matches!(tool.name.as_deref(), Some("browser.open"))
        || matches!(tool.tool_type.as_deref(), Some("browser_open" | "browser.open"))
}

fn argument_query(tool: &ExecutedTool) -> Option<String> {
    let arguments = parse_arguments(tool.arguments.as_deref().unwrap_or_default());
    arguments.get("query").and_then(Value::as_str).map(str::to_owned)
}

fn first_result_url(tool: &ExecutedTool) -> Option<&str> {
    tool.search_results
        .as_ref()
        .and_then(|results| results.results.first())
        .and_then(|result| result.url.as_deref())
}

/// Activity for a streamed execution; only entries carrying `output` count
pub fn executed_tool_activity(tool: &ExecutedTool) -> Option<ActivityEvent> {
    if tool.output.as_ref().is_none_or(Value::is_null) {
        return None;
    }

    if is_search(tool) {
        let query = argument_query(tool).unwrap_or_else(|| "web".to_owned());
        return Some(ActivityEvent::web_search(query));
    }

    if is_open(tool) {
        let url = first_result_url(tool)?;
        return Some(ActivityEvent::web_read(url, domain_of(url)));
    }

    None
}

/// Source labels for a whole-response execution list
fn executed_tool_sources(tools: &[ExecutedTool]) -> Vec<String> {
    tools
        .iter()
        .filter_map(|tool| {
            if is_search(tool) {
                tool.query.clone().or_else(|| argument_query(tool)).map(|q| format!("search: {q}"))
            } else if is_open(tool) {
                tool.url.as_deref().or_else(|| first_result_url(tool)).map(domain_of)
            } else {
                None
            }
        })
        .collect()
}

/// Fold whole-response search and reasoning into the visible content
fn prefix_extensions(mut content: String, executed: &[ExecutedTool], reasoning: Option<&str>) -> String {
    let sources = executed_tool_sources(executed);
    if !sources.is_empty() {
        let listed = sources.into_iter().take(MAX_LISTED_SOURCES).collect::<Vec<_>>().join(", ");
        content = format!("\u{1f50d} *Searched the web* ({listed})\n\n{content}");
    }

    if let Some(reasoning) = reasoning.map(str::trim).filter(|r| !r.is_empty()) {
        content = format!("<details><summary>\u{1f4ad} Reasoning</summary>\n\n{reasoning}\n\n</details>\n\n{content}");
    }

    content
}

/// Decode a whole chat completions response from the first choice
///
/// Groq reasoning and executed tools are folded into the content.
pub fn parse_response(response: OpenAiResponse, raw: Value) -> LlmResponse {
    let Some(choice) = response.choices.into_iter().next() else {
        let mut failed = LlmResponse::error("No choices in response");
        failed.raw = raw;
        return failed;
    };

    let message = choice.message;
    let executed = response.executed_tools.or(message.executed_tools).unwrap_or_default();
    let reasoning = response.reasoning.or(message.reasoning);
    let content = prefix_extensions(message.content.unwrap_or_default(), &executed, reasoning.as_deref());

    let mut tool_calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            ToolCall::new(
                call.id.unwrap_or_default(),
                call.function.name,
                arguments_from_value(call.function.arguments),
            )
        })
        .collect();
    ensure_unique_ids(&mut tool_calls);

    LlmResponse {
        content,
        tool_calls,
        finish_reason: map_finish_reason(choice.finish_reason.as_deref()),
        model: response.model,
        usage: response.usage.map(Usage::from),
        raw,
        error: None,
    }
}

// -- Stream conversion --

/// Delta accumulation for one streamed completion
#[derive(Debug, Default)]
pub(crate) struct OpenAiStreamState {
    tools: ToolCallAccumulator,
    model: Option<String>,
    done: bool,
}

impl OpenAiStreamState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn convert_chunk(&mut self, chunk: OpenAiStreamChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(model) = chunk.model.filter(|m| self.model.as_ref() != Some(m)) {
            self.model = Some(model.clone());
            events.push(StreamEvent::ModelInfo(model));
        }

        if let Some(choice) = chunk.choices.into_iter().next() {
            let delta = choice.delta;

            for tool in delta.executed_tools.iter().flatten() {
                events.extend(executed_tool_activity(tool).map(StreamEvent::Activity));
            }

            if let Some(content) = delta.content {
                events.push(StreamEvent::ContentDelta(content));
            }

            if let Some(text) = delta.reasoning.or(delta.reasoning_content) {
                events.push(StreamEvent::ReasoningDelta {
                    text,
                    channel: delta.channel.unwrap_or_else(|| DEFAULT_REASONING_CHANNEL.to_owned()),
                });
            }

            for fragment in delta.tool_calls.unwrap_or_default() {
                let key = ToolCallKey::Index(fragment.index);
                let (name, arguments) = fragment.function.map_or((None, None), |f| (f.name, f.arguments));
                self.tools
                    .apply(key.clone(), fragment.id.as_deref(), name.as_deref(), arguments.as_deref());
                events.push(StreamEvent::ToolCallDelta { key, name, arguments });
            }

            if let Some(reason) = choice.finish_reason.as_deref() {
                events.push(StreamEvent::Finish(map_finish_reason(Some(reason))));
            }
        }

        if let Some(usage) = chunk.usage.or_else(|| chunk.x_groq.and_then(|x| x.usage)) {
            events.push(StreamEvent::Usage(usage.into()));
        }

        events
    }
}

impl StreamDecoder for OpenAiStreamState {
    fn decode(&mut self, frame: &str) -> Vec<StreamEvent> {
        if frame == "[DONE]" {
            self.done = true;
            return Vec::new();
        }

        parse_frame::<OpenAiStreamChunk>(frame).map_or_else(Vec::new, |chunk| self.convert_chunk(chunk))
    }

    /// Tool-call slots are decoded only here, once no more fragments can arrive
    fn finish(&mut self) -> Vec<StreamEvent> {
        self.tools.drain().into_iter().map(StreamEvent::ToolCallComplete).collect()
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
