//! Common test utilities and helpers
//!
//! A wiremock server standing in for the MemoRable MCP endpoint, plus
//! builders for the JSON-RPC replies it sends back.

#![allow(dead_code)]

use memorable_core::{MemorableClient, MemorableConfig};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Session id the mock hands out during `initialize`
pub const TEST_SESSION: &str = "test-session-1";

/// Config pointing at the mock server's `/mcp` path
pub fn test_config(server: &MockServer) -> MemorableConfig {
    MemorableConfig::default().with_mcp_url(format!("{}/mcp", server.uri()))
}

/// Client pointing at the mock server
pub fn create_test_client(server: &MockServer) -> MemorableClient {
    MemorableClient::new(test_config(server))
}

/// Client for an endpoint nothing listens on
pub fn create_unreachable_client() -> MemorableClient {
    MemorableClient::new(
        MemorableConfig::default()
            .with_mcp_url("http://127.0.0.1:9/mcp")
            .with_health_timeout(Duration::from_secs(1)),
    )
}

/// JSON-RPC success envelope
pub fn rpc_result(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

/// JSON-RPC error envelope
pub fn rpc_error(code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "error": {"code": code, "message": message}})
}

/// `tools/call` result with one text block holding `payload` as JSON
pub fn tool_result(payload: &Value) -> Value {
    rpc_result(json!({
        "content": [{"type": "text", "text": payload.to_string()}]
    }))
}

/// `tools/call` result with one free-text block
pub fn tool_text(text: &str) -> Value {
    rpc_result(json!({
        "content": [{"type": "text", "text": text}]
    }))
}

/// SSE body carrying the given JSON-RPC messages as `data:` frames
pub fn sse_body(messages: &[Value]) -> String {
    messages
        .iter()
        .map(|m| format!("event: message\ndata: {}\n\n", m))
        .collect()
}

/// Accept `initialize` (assigning [`TEST_SESSION`]) and the follow-up notification
pub async fn mount_handshake(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Mcp-Session-Id", TEST_SESSION)
                .set_body_json(rpc_result(json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "memorable-mock", "version": "0.0.0"}
                }))),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "notifications/initialized"})))
        .respond_with(ResponseTemplate::new(202))
        .mount(server)
        .await;
}

/// Answer `tools/call` for `tool` with `payload` wrapped in a text block
pub async fn mount_tool(server: &MockServer, tool: &str, payload: Value) {
    mount_tool_response(
        server,
        tool,
        ResponseTemplate::new(200).set_body_json(tool_result(&payload)),
    )
    .await;
}

/// Answer `tools/call` for `tool` with an arbitrary response
pub async fn mount_tool_response(server: &MockServer, tool: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": {"name": tool}
        })))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Health endpoint answering with `status`
pub async fn mount_health(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Everything the mock saw, as parsed JSON bodies (GETs skipped)
pub async fn received_bodies(server: &MockServer) -> Vec<Value> {
    received_posts(server)
        .await
        .iter()
        .map(|r| r.body_json::<Value>().expect("request body was not JSON"))
        .collect()
}

pub async fn received_posts(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .collect()
}

/// Arguments of the last `tools/call` for `tool`
pub async fn tool_arguments(server: &MockServer, tool: &str) -> Value {
    received_bodies(server)
        .await
        .into_iter()
        .filter(|b| b["method"] == "tools/call" && b["params"]["name"] == tool)
        .last()
        .map(|b| b["params"]["arguments"].clone())
        .unwrap_or_else(|| panic!("no tools/call for {}", tool))
}

/// Number of POSTs with the given JSON-RPC method
pub async fn count_method(server: &MockServer, rpc_method: &str) -> usize {
    received_bodies(server)
        .await
        .iter()
        .filter(|b| b["method"] == rpc_method)
        .count()
}
