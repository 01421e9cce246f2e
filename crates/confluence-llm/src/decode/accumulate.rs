//! Assembly of tool calls from streamed fragments

use std::collections::HashSet;

use serde_json::Value;

use crate::types::{ToolArguments, ToolCall, ToolCallKey};

/// Decode a complete argument string into a map
///
/// Empty, malformed and non-object input all yield an empty map.
pub fn parse_arguments(raw: &str) -> ToolArguments {
    let raw = raw.trim();
    if raw.is_empty() {
        return ToolArguments::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!(kind = json_kind(&other), "tool arguments are not an object, using empty map");
            ToolArguments::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "tool arguments failed to parse, using empty map");
            ToolArguments::new()
        }
    }
}

/// Accept arguments delivered either as an object or as an encoded string
pub fn arguments_from_value(value: Value) -> ToolArguments {
    match value {
        Value::Object(map) => map,
        Value::String(raw) => parse_arguments(&raw),
        _ => ToolArguments::new(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A tool call still receiving fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingToolCall {
    pub id: String,
    pub name: String,
    /// Raw argument text, parsed only on completion
    pub arguments: String,
}

impl PendingToolCall {
    pub fn finish(self) -> ToolCall {
        ToolCall {
            arguments: parse_arguments(&self.arguments),
            id: self.id,
            name: self.name,
        }
    }
}

/// Slots of in-progress tool calls keyed by index or id
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    slots: Vec<(ToolCallKey, PendingToolCall)>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment, opening the slot on first sight of `key`
    ///
    /// `name` and `arguments` are appended; a non-empty `id` replaces the stored one.
    pub fn apply(&mut self, key: ToolCallKey, id: Option<&str>, name: Option<&str>, arguments: Option<&str>) {
        let slot = match self.slots.iter().position(|(k, _)| *k == key) {
            Some(position) => &mut self.slots[position].1,
            None => {
                let id = match &key {
                    ToolCallKey::Id(id) => id.clone(),
                    ToolCallKey::Index(_) => String::new(),
                };
                self.slots.push((key, PendingToolCall { id, ..PendingToolCall::default() }));
                match self.slots.last_mut() {
                    Some((_, slot)) => slot,
                    None => return,
                }
            }
        };

        if let Some(id) = id.filter(|id| !id.is_empty()) {
            id.clone_into(&mut slot.id);
        }
        if let Some(name) = name {
            slot.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            slot.arguments.push_str(arguments);
        }
    }

    /// Close one slot and decode its arguments
    pub fn complete(&mut self, key: &ToolCallKey) -> Option<ToolCall> {
        let position = self.slots.iter().position(|(k, _)| k == key)?;
        Some(self.slots.remove(position).1.finish())
    }

    /// Close every slot; index-keyed slots come out in index order
    pub fn drain(&mut self) -> Vec<ToolCall> {
        let mut slots = std::mem::take(&mut self.slots);
        slots.sort_by_key(|(key, _)| key.index());
        slots.into_iter().map(|(_, pending)| pending.finish()).collect()
    }

    pub fn get(&self, key: &ToolCallKey) -> Option<&PendingToolCall> {
        self.slots.iter().find(|(k, _)| k == key).map(|(_, slot)| slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Replace missing or repeated ids with generated ones
pub fn ensure_unique_ids(calls: &mut [ToolCall]) {
    let mut seen = HashSet::with_capacity(calls.len());
    for call in calls {
        if call.id.is_empty() || !seen.insert(call.id.clone()) {
            call.id = ToolCall::generate_id();
            seen.insert(call.id.clone());
        }
    }
}
