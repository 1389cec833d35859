//! Lifecycle hooks for an embodied agent
//!
//! Small conveniences for the three moments an agent talks to its long-term
//! memory: startup, recognizing someone, and the end of a conversation. All
//! return [`Outcome`] so the agent keeps running when the service is down.

use crate::client::{MemorableClient, SOCIAL_INTERACTION};
use crate::error::Outcome;
use crate::types::Briefing;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

/// Announce the agent and fetch what is relevant right now
///
/// Unreachable service → `Unavailable`; the agent should continue without
/// long-term memory.
pub async fn on_startup(
    client: &MemorableClient,
    location: Option<&str>,
) -> Outcome<Map<String, Value>> {
    if !client.health_check().await {
        warn!("MemoRable not available, running without long-term memory");
        return Outcome::Unavailable;
    }

    if !client.connect().await {
        return Outcome::Unavailable;
    }

    let relevant = match client
        .set_context(location, None, Some(SOCIAL_INTERACTION))
        .await
    {
        Ok(_) => client.whats_relevant().await,
        Err(e) => Err(e),
    };
    if relevant.is_ok() {
        info!("MemoRable: connected via MCP, context set");
    }
    relevant.into()
}

/// Briefing for someone the agent just recognized
pub async fn on_person_recognized(
    client: &MemorableClient,
    name: &str,
) -> Outcome<Option<Briefing>> {
    let briefing = client.get_briefing(name, false).await;
    if let Ok(Some(ref b)) = briefing {
        info!("MemoRable: briefing on {}", name);
        if !b.you_owe_them.is_empty() {
            info!("  You owe them: {:?}", b.you_owe_them);
        }
    }
    briefing.into()
}

/// Store the summary of a finished conversation
pub async fn on_conversation_end(
    client: &MemorableClient,
    person: Option<&str>,
    summary: &str,
) -> Outcome<Option<String>> {
    let mut context = Map::new();
    if let Some(person) = person {
        context.insert("person".into(), json!(person));
    }
    client.store(summary, Some(context), None).await.into()
}
