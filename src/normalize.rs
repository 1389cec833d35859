//! Record normalizers
//!
//! Pure functions turning loosely shaped payloads into [`Memory`] and
//! [`Briefing`] records. Servers spell the same field several ways
//! (snake_case, camelCase, legacy names); each field has a fixed alias list
//! and the first present, non-null key wins.
//!
//! A record is either complete or rejected with a [`NormalizeError`]; there
//! are no half-filled records.

use crate::error::NormalizeError;
use crate::mcp::tools::ToolOutput;
use crate::types::{Briefing, Memory, DEFAULT_SALIENCE};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

pub const MEMORY_ID_KEYS: &[&str] = &["_id", "id", "memoryId", "memory_id"];
pub const CONTENT_KEYS: &[&str] = &["content", "text"];
pub const SALIENCE_KEYS: &[&str] = &["salience", "salience_score", "salienceScore"];
pub const TIMESTAMP_KEYS: &[&str] = &["timestamp", "createdAt", "created_at"];
pub const LAST_INTERACTION_KEYS: &[&str] = &["last_interaction", "lastInteraction"];
pub const YOU_OWE_THEM_KEYS: &[&str] = &["you_owe_them", "youOweThem"];
pub const THEY_OWE_YOU_KEYS: &[&str] = &["they_owe_you", "theyOweYou"];
pub const RECENT_TOPICS_KEYS: &[&str] = &["recent_topics", "recentTopics"];
pub const SENSITIVITIES_KEYS: &[&str] = &["sensitivities"];
pub const UPCOMING_EVENTS_KEYS: &[&str] = &["upcoming_events", "upcomingEvents"];

/// Key under which map-shaped recall results list their memories
pub const MEMORIES_FIELD: &str = "memories";

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// First present, non-null alias
fn first<'a>(
    map: &'a Map<String, Value>,
    keys: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Missing lists are empty; a lone string is a one-item list
fn string_list(map: &Map<String, Value>, keys: &[&'static str]) -> Vec<String> {
    match first(map, keys) {
        Some((_, Value::Array(items))) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some((_, Value::String(s))) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Parse an ISO-8601 timestamp
///
/// A trailing `Z` is read as `+00:00`. Naive date-times and bare dates are
/// taken as UTC.
pub fn parse_timestamp(
    field: &'static str,
    raw: &str,
) -> Result<DateTime<FixedOffset>, NormalizeError> {
    let trimmed = raw.trim();
    let text = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(head) => format!("{}+00:00", head),
        None => trimmed.to_string(),
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&text) {
        return Ok(ts);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(&text, fmt) {
            return Ok(ts);
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, fmt) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().fixed_offset());
    }

    Err(NormalizeError::Timestamp {
        field,
        value: raw.to_string(),
    })
}

fn timestamp_field(
    value: &Value,
    field: &'static str,
) -> Result<DateTime<FixedOffset>, NormalizeError> {
    match value {
        Value::String(s) => parse_timestamp(field, s),
        other => Err(NormalizeError::Timestamp {
            field,
            value: other.to_string(),
        }),
    }
}

/// Normalize a memory, defaulting a missing timestamp to now
pub fn memory_from_map(map: &Map<String, Value>) -> Result<Memory, NormalizeError> {
    memory_from_map_at(map, Utc::now().fixed_offset())
}

/// Normalize a memory with an explicit "now" for missing timestamps
pub fn memory_from_map_at(
    map: &Map<String, Value>,
    now: DateTime<FixedOffset>,
) -> Result<Memory, NormalizeError> {
    let timestamp = match first(map, TIMESTAMP_KEYS) {
        Some((field, value)) => timestamp_field(value, field)?,
        None => now,
    };

    Ok(Memory {
        id: first(map, MEMORY_ID_KEYS)
            .and_then(|(_, v)| string_of(v))
            .unwrap_or_default(),
        content: first(map, CONTENT_KEYS)
            .and_then(|(_, v)| v.as_str())
            .unwrap_or_default()
            .to_string(),
        salience: first(map, SALIENCE_KEYS)
            .and_then(|(_, v)| number_of(v))
            .unwrap_or(DEFAULT_SALIENCE),
        timestamp,
        entity: map.get("entity").and_then(Value::as_str).map(str::to_string),
        context: match map.get("context") {
            Some(Value::Object(ctx)) => ctx.clone(),
            _ => Map::new(),
        },
    })
}

pub fn memory_from_value(value: &Value) -> Result<Memory, NormalizeError> {
    match value {
        Value::Object(map) => memory_from_map(map),
        _ => Err(NormalizeError::NotAnObject("memory")),
    }
}

/// Memories from a recall result: a bare list or `{"memories": [...]}`
///
/// Entries that cannot be normalized are dropped with a warning.
pub fn memories_from_output(output: ToolOutput) -> Vec<Memory> {
    output
        .into_list(MEMORIES_FIELD)
        .iter()
        .filter_map(|raw| match memory_from_value(raw) {
            Ok(memory) => Some(memory),
            Err(e) => {
                warn!("Dropping memory that could not be normalized: {}", e);
                None
            }
        })
        .collect()
}

/// Normalize a briefing
///
/// `Ok(None)` when `person` is missing or empty: there is no briefing.
pub fn briefing_from_map(map: &Map<String, Value>) -> Result<Option<Briefing>, NormalizeError> {
    let person = match map.get("person").and_then(Value::as_str) {
        Some(person) if !person.is_empty() => person.to_string(),
        _ => return Ok(None),
    };

    let last_interaction = match first(map, LAST_INTERACTION_KEYS) {
        Some((_, Value::String(s))) if s.is_empty() => None,
        Some((field, value)) => Some(timestamp_field(value, field)?),
        None => None,
    };

    Ok(Some(Briefing {
        person,
        last_interaction,
        you_owe_them: string_list(map, YOU_OWE_THEM_KEYS),
        they_owe_you: string_list(map, THEY_OWE_YOU_KEYS),
        recent_topics: string_list(map, RECENT_TOPICS_KEYS),
        sensitivities: string_list(map, SENSITIVITIES_KEYS),
        upcoming_events: string_list(map, UPCOMING_EVENTS_KEYS),
    }))
}

/// Briefing from a tool result; anything but a complete briefing is `None`
pub fn briefing_from_output(output: ToolOutput) -> Option<Briefing> {
    let map = output.into_map();
    match briefing_from_map(&map) {
        Ok(briefing) => briefing,
        Err(e) => {
            warn!("Discarding briefing that could not be normalized: {}", e);
            None
        }
    }
}
