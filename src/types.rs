//! Core data types for the MemoRable client
//!
//! Records the remote service returns after normalization. Both types are
//! `#[non_exhaustive]`: outside this crate they can only come out of the
//! normalizers in [`crate::normalize`], which own all field-aliasing logic.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::{Map, Value};

/// Salience assigned when the payload carries none
pub const DEFAULT_SALIENCE: f64 = 50.0;

/// Default security tier for stored memories
pub const DEFAULT_SECURITY_TIER: &str = "Tier2_Personal";

/// A single memory with salience scoring
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Memory {
    /// Server-side identifier (empty if the payload had none)
    pub id: String,

    /// Memory text
    pub content: String,

    /// Salience score, 0-100 on the reference service
    pub salience: f64,

    /// When the memory was created
    pub timestamp: DateTime<FixedOffset>,

    /// Entity the memory belongs to
    pub entity: Option<String>,

    /// Free-form context stored with the memory
    pub context: Map<String, Value>,
}

/// Pre-conversation briefing about a person
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Briefing {
    /// Who the briefing is about (never empty)
    pub person: String,

    /// Last recorded interaction
    pub last_interaction: Option<DateTime<FixedOffset>>,

    /// Open commitments toward the person
    pub you_owe_them: Vec<String>,

    /// Open commitments from the person
    pub they_owe_you: Vec<String>,

    pub recent_topics: Vec<String>,

    /// Topics to handle with care
    pub sensitivities: Vec<String>,

    pub upcoming_events: Vec<String>,
}

impl Briefing {
    /// True when anything is owed in either direction
    pub fn has_open_loops(&self) -> bool {
        !self.you_owe_them.is_empty() || !self.they_owe_you.is_empty()
    }
}
