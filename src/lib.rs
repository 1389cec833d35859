//! MemoRable - MCP client for a long-term memory service
//!
//! Talks to the MemoRable service over the Model Context Protocol:
//! JSON-RPC 2.0 over HTTP, with replies as plain JSON or SSE streams.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//! - **MCP**: envelopes, body decoding, session lifecycle, tool calls
//! - **Normalize**: tolerant mapping of remote payloads into records
//! - **Types**: `Memory` and `Briefing` records
//! - **Client**: named memory operations (store, recall, briefing, ...)
//! - **Hooks**: startup / recognition / conversation-end conveniences
//!
//! # Example
//!
//! ```ignore
//! use memorable_core::{MemorableClient, MemorableConfig};
//!
//! #[tokio::main]
//! async fn main() -> memorable_core::Result<()> {
//!     let memory = MemorableClient::new(MemorableConfig::load()?);
//!
//!     // Meeting someone
//!     if let Some(briefing) = memory.get_briefing("Alan", false).await? {
//!         println!("You owe them: {:?}", briefing.you_owe_them);
//!     }
//!
//!     // Store and recall
//!     memory.store("Great conversation about robot hiking with Alan", None, None).await?;
//!     let memories = memory.recall("hiking plans", 10, 0.0).await?;
//!
//!     memory.close().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod mcp;
pub mod normalize;
pub mod types;

// Re-export commonly used types
pub use client::{MemorableClient, SharedClient};
pub use config::MemorableConfig;
pub use error::{MemorableError, NormalizeError, Outcome, RemoteError, Result};
pub use mcp::{ConnectionState, McpClient, ResultShape, ToolOutput};
pub use types::{Briefing, Memory};
