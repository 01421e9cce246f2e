use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tool made available to the model for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the arguments
    #[serde(default)]
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Parameter schema, defaulting to an empty object schema when unset
    pub fn schema(&self) -> Value {
        match &self.parameters {
            Value::Null => json!({"type": "object", "properties": {}}),
            Value::Object(map) if map.is_empty() => json!({"type": "object", "properties": {}}),
            other => other.clone(),
        }
    }
}

/// How the model may use the supplied tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides
    Auto,
    /// Model must call some tool
    Required,
    /// Model must not call tools
    None,
    /// Model must call the named tool
    Function(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_schema_defaults_to_empty_object() {
        let tool = ToolDefinition::new("ping", "", Value::Null);
        assert_eq!(tool.schema(), json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn explicit_schema_is_kept() {
        let schema = json!({"type": "object", "properties": {"city": {"type": "string"}}});
        let tool = ToolDefinition::new("weather", "Look up weather", schema.clone());
        assert_eq!(tool.schema(), schema);
    }
}
