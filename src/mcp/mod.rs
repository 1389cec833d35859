//! Model Context Protocol (MCP) client implementation
//!
//! Speaks JSON-RPC 2.0 over StreamableHTTP to a remote memory service:
//! replies come back as plain JSON or as an SSE stream, and a session id
//! negotiated during `initialize` is echoed on every request.

pub mod client;
pub mod protocol;
pub mod session;
pub mod tools;

pub use client::McpClient;
pub use protocol::{JsonRpcRequest, PROTOCOL_VERSION, SESSION_HEADER};
pub use session::{ConnectionState, Session};
pub use tools::{ResultShape, ToolOutput};
