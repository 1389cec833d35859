//! Tool-call results
//!
//! MCP servers wrap tool output in content blocks whose first entry carries a
//! `text` field. That text may hold JSON or free text; [`ToolOutput`] records
//! which one arrived so callers branch on a tag instead of probing types.

use serde_json::{Map, Value};

/// Decoded result of a `tools/call`
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// JSON, either parsed from the content text or the raw result
    Structured(Value),

    /// Content text that was not JSON
    Text(String),

    /// Null result, or content text `null`
    Empty,
}

/// Coarse shape of a tool result, one variant per decoding branch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultShape<'a> {
    List(&'a [Value]),
    Map(&'a Map<String, Value>),
    Text(&'a str),
    Unrecognized,
}

impl ToolOutput {
    /// Unwrap the content-block convention from a raw `tools/call` result
    ///
    /// A map whose `content` list starts with a block carrying `text` yields
    /// that text, JSON-decoded when possible. Everything else is passed
    /// through unchanged.
    pub fn from_tool_result(result: Value) -> Self {
        if let Some(text) = first_block_text(&result) {
            return Self::from_text(text);
        }
        match result {
            Value::Null => ToolOutput::Empty,
            other => ToolOutput::Structured(other),
        }
    }

    /// Best-effort JSON decode; never fails, degrades to the raw text
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Null) => ToolOutput::Empty,
            Ok(value) => ToolOutput::Structured(value),
            Err(_) => ToolOutput::Text(text.to_string()),
        }
    }

    pub fn shape(&self) -> ResultShape<'_> {
        match self {
            ToolOutput::Structured(Value::Array(items)) => ResultShape::List(items),
            ToolOutput::Structured(Value::Object(map)) => ResultShape::Map(map),
            ToolOutput::Structured(Value::String(text)) => ResultShape::Text(text),
            ToolOutput::Text(text) => ResultShape::Text(text),
            _ => ResultShape::Unrecognized,
        }
    }

    /// Truthiness used by boolean operations (`forget`, `close_loop`, ...)
    ///
    /// Null, `false`, zero and empty strings, lists or maps are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            ToolOutput::Empty => false,
            ToolOutput::Text(text) => !text.is_empty(),
            ToolOutput::Structured(value) => json_truthy(value),
        }
    }

    /// The result as a map; any other shape becomes an empty map
    pub fn into_map(self) -> Map<String, Value> {
        match self {
            ToolOutput::Structured(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// A list result, or the list under `key` of a map result
    pub fn into_list(self, key: &str) -> Vec<Value> {
        match self {
            ToolOutput::Structured(Value::Array(items)) => items,
            ToolOutput::Structured(Value::Object(map)) => list_field(map, key),
            _ => Vec::new(),
        }
    }

    /// Only the list under `key` of a map result
    pub fn into_field_list(self, key: &str) -> Vec<Value> {
        match self {
            ToolOutput::Structured(Value::Object(map)) => list_field(map, key),
            _ => Vec::new(),
        }
    }

    /// String-ish field of a map result (numbers are rendered)
    pub fn string_field(&self, key: &str) -> Option<String> {
        match self.shape() {
            ResultShape::Map(map) => match map.get(key)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Back to a plain JSON value
    pub fn into_value(self) -> Value {
        match self {
            ToolOutput::Structured(value) => value,
            ToolOutput::Text(text) => Value::String(text),
            ToolOutput::Empty => Value::Null,
        }
    }
}

fn first_block_text(result: &Value) -> Option<&str> {
    result
        .get("content")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
}

fn list_field(mut map: Map<String, Value>, key: &str) -> Vec<Value> {
    match map.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
