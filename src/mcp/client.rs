//! MCP client over StreamableHTTP
//!
//! Sends JSON-RPC envelopes by HTTP POST, tracks the `Mcp-Session-Id` the
//! server hands out, runs the initialize handshake and wraps `tools/call`.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --ensure_connected()--> Initializing --ok--> Ready
//!      ^                                   |                  |
//!      +-------------- failure ------------+                  |
//!      +----------------------- close() ----------------------+
//! ```
//!
//! The HTTP client is created on first use and dropped by `close()`; the next
//! request creates a fresh one.

use super::protocol::{
    self, JsonRpcRequest, ACCEPT, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL,
    SESSION_HEADER,
};
use super::session::{ConnectionState, Session};
use super::tools::ToolOutput;
use crate::config::MemorableConfig;
use crate::error::{MemorableError, Result};
use reqwest::header::{self, HeaderMap};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Version reported in `clientInfo`
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC client bound to one MCP endpoint
#[derive(Debug)]
pub struct McpClient {
    url: String,
    health_url: String,
    health_timeout: Duration,
    client_name: String,
    http: Mutex<Option<reqwest::Client>>,
    session: Session,
}

impl McpClient {
    /// Create a disconnected client; nothing is sent until first use
    pub fn new(config: &MemorableConfig) -> Self {
        Self {
            url: config.mcp_url.clone(),
            health_url: config.health_url(),
            health_timeout: config.health_timeout(),
            client_name: format!("memorable-{}", config.entity),
            http: Mutex::new(None),
            session: Session::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn http(&self) -> Result<reqwest::Client> {
        let mut slot = self.http.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        debug!("Opening HTTP client for {}", self.url);
        let client = reqwest::Client::builder()
            .user_agent(format!("memorable/{}", CLIENT_VERSION))
            .build()?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Send one JSON-RPC message and decode the reply
    ///
    /// Requests take the next id; notifications take none and never read a
    /// body. Returns `Value::Null` when there is nothing to return.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        is_notification: bool,
    ) -> Result<Value> {
        let envelope = if is_notification {
            JsonRpcRequest::notification(method, params)
        } else {
            JsonRpcRequest::request(self.session.next_id(), method, params)
        };
        self.send(&envelope).await
    }

    async fn send(&self, envelope: &JsonRpcRequest) -> Result<Value> {
        let http = self.http().await?;
        let (session_id, epoch) = self.session.snapshot().await;

        let mut request = http
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, ACCEPT)
            .json(envelope);
        if let Some(ref sid) = session_id {
            request = request.header(SESSION_HEADER, sid);
        }

        debug!(
            "MCP -> {} (id: {:?}, session: {})",
            envelope.method,
            envelope.id,
            session_id.as_deref().unwrap_or("none")
        );
        let response = request.send().await?;
        let status = response.status();

        // Recorded before looking at the body: a rejection may still assign a session
        if let Some(sid) = header_str(response.headers(), SESSION_HEADER) {
            self.session.record_session_id(sid.to_string(), epoch).await;
        }

        if envelope.is_notification()
            || status == StatusCode::ACCEPTED
            || status == StatusCode::NO_CONTENT
        {
            debug!("MCP <- {} {} (no body)", envelope.method, status.as_u16());
            return Ok(Value::Null);
        }

        let content_type = header_str(response.headers(), header::CONTENT_TYPE.as_str())
            .map(str::to_owned);
        let body = response.text().await?;
        debug!(
            "MCP <- {} {} ({} bytes, {})",
            envelope.method,
            status.as_u16(),
            body.len(),
            content_type.as_deref().unwrap_or("no content type")
        );

        protocol::decode_body(content_type.as_deref(), &body).map_err(|e| match e {
            MemorableError::McpProtocol(msg) => {
                MemorableError::McpProtocol(format!("{} [HTTP {}]", msg, status.as_u16()))
            }
            other => other,
        })
    }

    /// Run the initialize handshake unless the session is already ready
    ///
    /// Concurrent callers wait for one handshake instead of racing. The state
    /// reads `Initializing` while it runs.
    pub async fn connect(&self) -> Result<()> {
        let _handshake = self.session.lock_handshake().await;
        if self.session.is_ready().await {
            return Ok(());
        }

        self.session.set_state(ConnectionState::Initializing).await;
        match self.handshake().await {
            Ok(()) => {
                self.session.set_state(ConnectionState::Ready).await;
                info!(
                    "Connected to MemoRable MCP at {} (session: {})",
                    self.url,
                    self.session.session_id().await.as_deref().unwrap_or("none")
                );
                Ok(())
            }
            Err(e) => {
                self.session.set_state(ConnectionState::Disconnected).await;
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> Result<()> {
        let params = protocol::initialize_params(&self.client_name, CLIENT_VERSION);
        let result = self
            .send_request(METHOD_INITIALIZE, Some(params), false)
            .await?;
        if let Some(version) = result.get("protocolVersion").and_then(Value::as_str) {
            debug!("Server speaks MCP {}", version);
        }

        // Servers must not be queried before they see this
        self.send_request(METHOD_INITIALIZED, None, true).await?;
        Ok(())
    }

    /// Connect if needed; failures are logged and reported as `false`
    pub async fn ensure_connected(&self) -> bool {
        match self.connect().await {
            Ok(()) => true,
            Err(e) => {
                warn!("MemoRable MCP init failed: {}", e);
                false
            }
        }
    }

    /// Drop the HTTP client and forget the session
    ///
    /// Requests still in flight finish on their own connection; their session
    /// header is ignored.
    pub async fn close(&self) {
        let _handshake = self.session.lock_handshake().await;
        if self.http.lock().await.take().is_some() {
            debug!("Released HTTP client for {}", self.url);
        }
        self.session.reset().await;
        let previous = self.session.set_state(ConnectionState::Disconnected).await;
        if previous != ConnectionState::Disconnected {
            info!("MemoRable MCP session closed");
        }
    }

    /// Liveness probe against the sibling `/health` path
    ///
    /// HTTP 200 within the configured timeout means reachable. Never errors.
    pub async fn health_check(&self) -> bool {
        let http = match self.http().await {
            Ok(http) => http,
            Err(e) => {
                debug!("Health check could not build HTTP client: {}", e);
                return false;
            }
        };

        match http
            .get(&self.health_url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!("Health {} -> {}", self.health_url, response.status());
                response.status() == StatusCode::OK
            }
            Err(e) => {
                debug!("Health check against {} failed: {}", self.health_url, e);
                false
            }
        }
    }

    /// Invoke a remote tool and unwrap its content blocks
    ///
    /// Connects lazily. A failed handshake does not stop the call; the call's
    /// own error is what the caller sees.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        if !self.session.is_ready().await {
            self.ensure_connected().await;
        }

        debug!("Calling MCP tool: {}", name);
        let params = protocol::tool_call_params(name, arguments);
        let result = self
            .send_request(METHOD_TOOLS_CALL, Some(params), false)
            .await?;
        Ok(ToolOutput::from_tool_result(result))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
