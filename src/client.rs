//! MemoRable facade
//!
//! Named memory operations on top of [`McpClient::call_tool`]. Each operation
//! is one tool name plus a fixed argument shape; the only logic here is
//! picking the right piece out of the tool result.
//!
//! There is no global instance. Build a client from a [`MemorableConfig`], or
//! use [`MemorableClient::shared`] for an `Arc` handle the application owns.

use crate::config::MemorableConfig;
use crate::error::Result;
use crate::mcp::{McpClient, ToolOutput};
use crate::normalize;
use crate::types::{Briefing, Memory, DEFAULT_SECURITY_TIER};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Caller-managed shared handle
pub type SharedClient = Arc<MemorableClient>;

/// Activity reported with context updates and predictions
pub const SOCIAL_INTERACTION: &str = "social_interaction";

/// Client for the MemoRable memory service
#[derive(Debug)]
pub struct MemorableClient {
    config: MemorableConfig,
    mcp: McpClient,
}

impl MemorableClient {
    pub fn new(config: MemorableConfig) -> Self {
        let mcp = McpClient::new(&config);
        Self { config, mcp }
    }

    /// Load configuration from file and environment, then build the client
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(MemorableConfig::load()?))
    }

    pub fn shared(config: MemorableConfig) -> SharedClient {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &MemorableConfig {
        &self.config
    }

    /// Underlying MCP client, for tools the facade does not wrap
    pub fn mcp(&self) -> &McpClient {
        &self.mcp
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Initialize the MCP session; `false` if the service is unavailable
    pub async fn connect(&self) -> bool {
        self.mcp.ensure_connected().await
    }

    pub async fn close(&self) {
        self.mcp.close().await
    }

    /// Is the service reachable?
    pub async fn health_check(&self) -> bool {
        self.mcp.health_check().await
    }

    async fn call(&self, tool: &str, arguments: Value) -> Result<ToolOutput> {
        self.mcp.call_tool(tool, arguments).await
    }

    // =========================================================================
    // Core Memory Operations
    // =========================================================================

    /// Store a memory; returns the new memory id when the server reports one
    pub async fn store(
        &self,
        content: &str,
        context: Option<Map<String, Value>>,
        security_tier: Option<&str>,
    ) -> Result<Option<String>> {
        let mut args = json!({
            "text": content,
            "securityTier": security_tier.unwrap_or(DEFAULT_SECURITY_TIER),
        });
        if let Some(context) = context.filter(|c| !c.is_empty()) {
            args["context"] = Value::Object(context);
        }

        let output = self.call("store_memory", args).await?;
        let memory_id = output.string_field("memoryId");
        debug!("Stored memory: {:?}", memory_id);
        Ok(memory_id)
    }

    /// Search memories
    pub async fn recall(
        &self,
        query: &str,
        limit: usize,
        min_salience: f64,
    ) -> Result<Vec<Memory>> {
        let mut args = json!({
            "query": query,
            "limit": limit,
        });
        if min_salience > 0.0 {
            args["minSalience"] = json!(min_salience);
        }

        let output = self.call("recall", args).await?;
        Ok(normalize::memories_from_output(output))
    }

    /// Forget a memory (`mode` defaults to "archive")
    pub async fn forget(&self, memory_id: &str, mode: Option<&str>) -> Result<bool> {
        let output = self
            .call(
                "forget",
                json!({
                    "memoryId": memory_id,
                    "mode": mode.unwrap_or("archive"),
                }),
            )
            .await?;
        Ok(output.is_truthy())
    }

    // =========================================================================
    // Context Awareness
    // =========================================================================

    /// Tell the service where this device is and what is going on
    pub async fn set_context(
        &self,
        location: Option<&str>,
        people: Option<&[String]>,
        activity: Option<&str>,
    ) -> Result<Map<String, Value>> {
        let mut args = self.device_args();
        if let Some(location) = location.filter(|l| !l.is_empty()) {
            args.insert("location".into(), json!(location));
        }
        if let Some(people) = people.filter(|p| !p.is_empty()) {
            args.insert("people".into(), json!(people));
        }
        if let Some(activity) = activity.filter(|a| !a.is_empty()) {
            args.insert("activity".into(), json!(activity));
        }

        Ok(self.call("set_context", Value::Object(args)).await?.into_map())
    }

    /// What is relevant right now
    pub async fn whats_relevant(&self) -> Result<Map<String, Value>> {
        Ok(self
            .call("whats_relevant", json!({"unified": true}))
            .await?
            .into_map())
    }

    pub async fn clear_context(&self) -> Result<bool> {
        let output = self
            .call("clear_context", json!({"deviceId": self.config.device_id}))
            .await?;
        Ok(output.is_truthy())
    }

    // =========================================================================
    // People & Relationships
    // =========================================================================

    /// Pre-conversation briefing; `None` if the service knows nobody by that name
    pub async fn get_briefing(&self, person: &str, quick: bool) -> Result<Option<Briefing>> {
        let output = self
            .call("get_briefing", json!({"person": person, "quick": quick}))
            .await?;
        Ok(normalize::briefing_from_output(output))
    }

    pub async fn get_relationship(
        &self,
        entity_a: &str,
        entity_b: &str,
    ) -> Result<Map<String, Value>> {
        Ok(self
            .call(
                "get_relationship",
                json!({"entity_a": entity_a, "entity_b": entity_b}),
            )
            .await?
            .into_map())
    }

    /// Store a "Met <name>" memory tagged with the person
    pub async fn remember_person(&self, name: &str, notes: Option<&str>) -> Result<Option<String>> {
        let content = match notes.filter(|n| !n.is_empty()) {
            Some(notes) => format!("Met {}. {}", name, notes),
            None => format!("Met {}", name),
        };
        let mut context = Map::new();
        context.insert("person".into(), json!(name));
        self.store(&content, Some(context), None).await
    }

    // =========================================================================
    // Commitments
    // =========================================================================

    /// Open commitments, optionally for one person
    pub async fn list_loops(&self, person: Option<&str>) -> Result<Vec<Value>> {
        let mut args = Map::new();
        if let Some(person) = person.filter(|p| !p.is_empty()) {
            args.insert("person".into(), json!(person));
        }
        Ok(self
            .call("list_loops", Value::Object(args))
            .await?
            .into_list("loops"))
    }

    pub async fn close_loop(&self, loop_id: &str, note: Option<&str>) -> Result<bool> {
        let mut args = json!({"loopId": loop_id});
        if let Some(note) = note.filter(|n| !n.is_empty()) {
            args["note"] = json!(note);
        }
        Ok(self.call("close_loop", args).await?.is_truthy())
    }

    // =========================================================================
    // Predictions & Anticipation
    // =========================================================================

    /// Predicted context and pre-surfaced memories for the next minutes
    pub async fn anticipate(&self, look_ahead_minutes: u32) -> Result<Map<String, Value>> {
        Ok(self
            .call(
                "anticipate",
                json!({"lookAheadMinutes": look_ahead_minutes}),
            )
            .await?
            .into_map())
    }

    /// Memories that should surface now
    pub async fn get_predictions(&self, topics: Option<&[String]>) -> Result<Vec<Value>> {
        let mut context = json!({
            "device_type": self.config.device_type,
            "activity_type": SOCIAL_INTERACTION,
        });
        if let Some(topics) = topics.filter(|t| !t.is_empty()) {
            context["topics"] = json!(topics);
        }
        Ok(self
            .call("get_predictions", json!({"context": context}))
            .await?
            .into_field_list("predictions"))
    }

    // =========================================================================
    // Device Handoff
    // =========================================================================

    /// Hand the current context off to another device
    pub async fn handoff_to(
        &self,
        target_device_id: &str,
        target_type: Option<&str>,
    ) -> Result<Map<String, Value>> {
        Ok(self
            .call(
                "handoff_device",
                json!({
                    "sourceDeviceId": self.config.device_id,
                    "targetDeviceId": target_device_id,
                    "targetDeviceType": target_type.unwrap_or("robot"),
                    "reason": "device_switch",
                }),
            )
            .await?
            .into_map())
    }

    /// Cross-device session state
    pub async fn get_session_continuity(&self) -> Result<Map<String, Value>> {
        Ok(self
            .call("get_session_continuity", Value::Object(self.device_args()))
            .await?
            .into_map())
    }

    // =========================================================================
    // Emotion & Status
    // =========================================================================

    pub async fn analyze_emotion(&self, text: &str) -> Result<Map<String, Value>> {
        Ok(self
            .call("analyze_emotion", json!({"text": text}))
            .await?
            .into_map())
    }

    pub async fn get_status(&self) -> Result<Map<String, Value>> {
        Ok(self.call("get_status", json!({})).await?.into_map())
    }

    fn device_args(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("deviceId".into(), json!(self.config.device_id));
        args.insert("deviceType".into(), json!(self.config.device_type));
        args
    }
}
