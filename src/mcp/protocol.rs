//! JSON-RPC 2.0 framing for MCP over StreamableHTTP
//!
//! Builds request/notification envelopes and decodes response bodies, which
//! arrive either as one JSON document or as an SSE stream of `data:` lines.

use crate::error::{MemorableError, RemoteError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON-RPC version string
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision declared during `initialize`
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Session correlation header, sent and received
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Accept header for every POST
pub const ACCEPT: &str = "application/json, text/event-stream";

/// Content type marking an SSE response body
pub const EVENT_STREAM: &str = "text/event-stream";

/// Prefix of an SSE line carrying one JSON document
const SSE_DATA_PREFIX: &str = "data: ";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC 2.0 request or notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,

    /// Method name to invoke
    pub method: String,

    /// Request ID (absent for notifications)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Parameters, omitted entirely when not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Request expecting a reply
    pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            id: Some(id),
            params,
        }
    }

    /// Fire-and-forget notification
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            id: None,
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// `initialize` params: protocol version, no capabilities, client identity
pub fn initialize_params(client_name: &str, client_version: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": client_name,
            "version": client_version,
        },
    })
}

/// `tools/call` params
pub fn tool_call_params(name: &str, arguments: Value) -> Value {
    json!({
        "name": name,
        "arguments": arguments,
    })
}

/// True when the response content type announces an SSE body
pub fn is_event_stream(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains(EVENT_STREAM))
}

/// Decode a response body according to its content type
pub fn decode_body(content_type: Option<&str>, body: &str) -> Result<Value> {
    if is_event_stream(content_type) {
        decode_sse_body(body)
    } else {
        decode_json_body(body)
    }
}

/// Decode a plain JSON body
///
/// `error` wins over `result`; a document carrying neither is returned as-is.
pub fn decode_json_body(body: &str) -> Result<Value> {
    let doc: Value = serde_json::from_str(body).map_err(|e| {
        MemorableError::McpProtocol(format!(
            "invalid JSON body: {} (body: {})",
            e,
            preview(body)
        ))
    })?;

    match take_reply(doc) {
        Reply::Result(value) => Ok(value),
        Reply::Error(err) => Err(MemorableError::Remote(err)),
        Reply::Neither(doc) => Ok(doc),
    }
}

/// Decode an SSE body
///
/// Scans line by line and answers from the first `data: ` document that
/// carries `result` or `error`; later frames are not consulted. No such frame
/// yields `Value::Null`.
pub fn decode_sse_body(body: &str) -> Result<Value> {
    for line in body.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(data) = line.strip_prefix(SSE_DATA_PREFIX) else {
            continue;
        };

        let doc: Value = serde_json::from_str(data).map_err(|e| {
            MemorableError::McpProtocol(format!(
                "invalid JSON in SSE frame: {} (data: {})",
                e,
                preview(data)
            ))
        })?;

        match take_reply(doc) {
            Reply::Result(value) => return Ok(value),
            Reply::Error(err) => return Err(MemorableError::Remote(err)),
            Reply::Neither(_) => continue,
        }
    }

    Ok(Value::Null)
}

enum Reply {
    Result(Value),
    Error(RemoteError),
    Neither(Value),
}

fn take_reply(doc: Value) -> Reply {
    match doc {
        Value::Object(mut map) => {
            if let Some(error) = map.remove("error") {
                Reply::Error(RemoteError::new(error))
            } else if let Some(result) = map.remove("result") {
                Reply::Result(result)
            } else {
                Reply::Neither(Value::Object(map))
            }
        }
        other => Reply::Neither(other),
    }
}

fn preview(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(200)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    &text[..end]
}
