//! Integration tests for the MCP transport
//!
//! Runs the client against a wiremock endpoint: handshake order, request ids,
//! session header tracking, JSON and SSE bodies, close and reconnect.

mod common;

use common::*;
use memorable_core::{ConnectionState, MemorableClient, MemorableError, ToolOutput};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_handshake_precedes_first_tool_call() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_tool(&server, "get_status", json!({"ok": true})).await;

    let client = create_test_client(&server);
    let output = client.mcp().call_tool("get_status", json!({})).await.unwrap();
    assert_eq!(output, ToolOutput::Structured(json!({"ok": true})));

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 3);

    assert_eq!(bodies[0]["jsonrpc"], "2.0");
    assert_eq!(bodies[0]["method"], "initialize");
    assert_eq!(bodies[0]["id"], 1);
    assert_eq!(bodies[0]["params"]["protocolVersion"], "2025-03-26");
    assert_eq!(bodies[0]["params"]["capabilities"], json!({}));
    assert_eq!(bodies[0]["params"]["clientInfo"]["name"], "memorable-chloe");

    assert_eq!(bodies[1]["method"], "notifications/initialized");
    assert!(bodies[1].get("id").is_none(), "notifications carry no id");
    assert!(bodies[1].get("params").is_none(), "absent params are omitted");

    assert_eq!(bodies[2]["method"], "tools/call");
    assert_eq!(bodies[2]["id"], 2);
    assert_eq!(bodies[2]["params"]["name"], "get_status");
    assert_eq!(bodies[2]["params"]["arguments"], json!({}));

    assert_eq!(client.mcp().session().state().await, ConnectionState::Ready);
}

#[tokio::test]
async fn test_session_header_echoed_after_initialize() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_tool(&server, "get_status", json!({})).await;

    let client = create_test_client(&server);
    client.mcp().call_tool("get_status", json!({})).await.unwrap();

    let posts = received_posts(&server).await;
    assert!(
        posts[0].headers.get("mcp-session-id").is_none(),
        "initialize must go out without a session"
    );
    for request in &posts[1..] {
        assert_eq!(
            request.headers.get("mcp-session-id").unwrap().to_str().unwrap(),
            TEST_SESSION
        );
    }
    assert_eq!(
        posts[0].headers.get("accept").unwrap().to_str().unwrap(),
        "application/json, text/event-stream"
    );
    assert_eq!(
        client.mcp().session().session_id().await.as_deref(),
        Some(TEST_SESSION)
    );
}

#[tokio::test]
async fn test_rotated_session_id_used_on_next_request() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_tool_response(
        &server,
        "whats_relevant",
        ResponseTemplate::new(200)
            .insert_header("Mcp-Session-Id", "rotated-session")
            .set_body_json(tool_result(&json!({}))),
    )
    .await;
    mount_tool(&server, "get_status", json!({})).await;

    let client = create_test_client(&server);
    client.whats_relevant().await.unwrap();
    client.get_status().await.unwrap();

    let posts = received_posts(&server).await;
    let last = posts.last().unwrap();
    assert_eq!(
        last.headers.get("mcp-session-id").unwrap().to_str().unwrap(),
        "rotated-session"
    );
}

#[tokio::test]
async fn test_session_recorded_from_error_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("Mcp-Session-Id", "from-failure")
                .set_body_string("internal failure"),
        )
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let result = client.mcp().send_request("ping", None, false).await;

    match result {
        Err(MemorableError::McpProtocol(msg)) => {
            assert!(msg.contains("500"), "status should be reported: {}", msg)
        }
        other => panic!("Expected McpProtocol error, got: {:?}", other),
    }
    assert_eq!(
        client.mcp().session().session_id().await.as_deref(),
        Some("from-failure")
    );
}

#[tokio::test]
async fn test_request_ids_increase_monotonically() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({}))))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    for _ in 0..3 {
        client.mcp().send_request("ping", None, false).await.unwrap();
    }
    client
        .mcp()
        .send_request("notifications/progress", None, true)
        .await
        .unwrap();
    client.mcp().send_request("ping", None, false).await.unwrap();

    let ids: Vec<Value> = received_bodies(&server)
        .await
        .into_iter()
        .map(|b| b.get("id").cloned().unwrap_or(Value::Null))
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), Value::Null, json!(4)]);
}

#[tokio::test]
async fn test_plain_json_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({"x": 1}))))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let value = client.mcp().send_request("ping", None, false).await.unwrap();
    assert_eq!(value, json!({"x": 1}));
}

#[tokio::test]
async fn test_sse_result() {
    let server = MockServer::start().await;
    let body = sse_body(&[rpc_result(json!(42))]);
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let value = client.mcp().send_request("ping", None, false).await.unwrap();
    assert_eq!(value, json!(42));
}

#[tokio::test]
async fn test_sse_first_decisive_frame_wins() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {"progress": 1}}),
        rpc_result(json!("first")),
        rpc_result(json!("second")),
    ]);
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let value = client.mcp().send_request("ping", None, false).await.unwrap();
    assert_eq!(value, json!("first"));
}

#[tokio::test]
async fn test_sse_without_reply_frame_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(": keepalive\n\n", "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let value = client.mcp().send_request("ping", None, false).await.unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_sse_error_frame() {
    let server = MockServer::start().await;
    let body = sse_body(&[rpc_error(-32000, "tool exploded")]);
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = client
        .mcp()
        .send_request("ping", None, false)
        .await
        .unwrap_err();
    assert_eq!(err.remote().and_then(|r| r.code()), Some(-32000));
}

#[tokio::test]
async fn test_remote_error_carries_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(rpc_error(-32601, "Method not found")),
        )
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = client
        .mcp()
        .send_request("no_such_method", None, false)
        .await
        .unwrap_err();

    let remote = err.remote().expect("expected a remote error");
    assert_eq!(remote.code(), Some(-32601));
    assert_eq!(remote.message(), Some("Method not found"));
    assert!(!err.is_unavailable());
}

#[tokio::test]
async fn test_body_without_result_or_error_returned_whole() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "odd"})))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let value = client.mcp().send_request("ping", None, false).await.unwrap();
    assert_eq!(value, json!({"status": "odd"}));
}

#[tokio::test]
async fn test_notification_ignores_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let value = client
        .mcp()
        .send_request("notifications/initialized", None, true)
        .await
        .unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_accepted_status_returns_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let value = client.mcp().send_request("ping", None, false).await.unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_non_json_tool_text_passes_through() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_tool_response(
        &server,
        "analyze_emotion",
        ResponseTemplate::new(200).set_body_json(tool_text("not json")),
    )
    .await;

    let client = create_test_client(&server);
    let output = client
        .mcp()
        .call_tool("analyze_emotion", json!({"text": "hi"}))
        .await
        .unwrap();
    assert_eq!(output, ToolOutput::Text("not json".to_string()));
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    let client = create_test_client(&server);
    assert!(client.connect().await);
    assert!(client.connect().await);

    assert_eq!(count_method(&server, "initialize").await, 1);
    assert_eq!(count_method(&server, "notifications/initialized").await, 1);
}

#[tokio::test]
async fn test_concurrent_connect_single_handshake() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    let client = Arc::new(create_test_client(&server));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.connect().await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert_eq!(count_method(&server, "initialize").await, 1);
}

#[tokio::test]
async fn test_failed_handshake_stays_disconnected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    assert!(client.mcp().connect().await.is_err());
    assert!(!client.connect().await);
    assert_eq!(
        client.mcp().session().state().await,
        ConnectionState::Disconnected
    );
    assert_eq!(count_method(&server, "notifications/initialized").await, 0);
}

#[tokio::test]
async fn test_close_then_reconnect() {
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    mount_tool(&server, "get_status", json!({"ok": true})).await;

    let client = create_test_client(&server);
    client.get_status().await.unwrap();

    client.close().await;
    assert_eq!(
        client.mcp().session().state().await,
        ConnectionState::Disconnected
    );
    assert_eq!(client.mcp().session().session_id().await, None);

    // Closing twice is harmless
    client.close().await;

    client.get_status().await.unwrap();
    assert_eq!(count_method(&server, "initialize").await, 2);
    assert_eq!(client.mcp().session().state().await, ConnectionState::Ready);

    // Ids keep counting across sessions
    let ids: Vec<u64> = received_bodies(&server)
        .await
        .iter()
        .filter_map(|b| b.get("id").and_then(Value::as_u64))
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_health_check_ok() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;

    let client = create_test_client(&server);
    assert!(client.health_check().await);
}

#[tokio::test]
async fn test_health_check_sub_second_timeout() {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;

    let client = MemorableClient::new(
        test_config(&server).with_health_timeout(Duration::from_millis(500)),
    );
    assert!(client.health_check().await);
}

#[tokio::test]
async fn test_health_check_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client =
        MemorableClient::new(test_config(&server).with_health_timeout(Duration::from_secs(1)));

    let started = Instant::now();
    assert!(!client.health_check().await);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "probe outlived its timeout: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_initializing_visible_during_handshake() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rpc_result(json!({"protocolVersion": "2025-03-26"})))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = Arc::new(create_test_client(&server));
    let connecting = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.connect().await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        client.mcp().session().state().await,
        ConnectionState::Initializing
    );

    assert!(connecting.await.unwrap());
    assert_eq!(client.mcp().session().state().await, ConnectionState::Ready);
}

#[tokio::test]
async fn test_health_check_non_200_is_unhealthy() {
    let server = MockServer::start().await;
    mount_health(&server, 503).await;

    let client = create_test_client(&server);
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_unavailable() {
    let client = create_unreachable_client();
    assert!(!client.health_check().await);
    assert!(!client.connect().await);

    let err = client.get_status().await.unwrap_err();
    assert!(err.is_unavailable(), "expected transport failure, got {:?}", err);
}
