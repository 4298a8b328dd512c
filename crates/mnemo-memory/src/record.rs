use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strongly typed wrapper for memory record IDs.
///
/// IDs are assigned from a monotonic counter and stay stable for a record's
/// lifetime; search ties resolve toward the lower id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub u64);

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One remembered fact. Immutable once created; the embedding lives in the
/// vector index under the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub text: String,
    pub importance: u8,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Input shape accepted by `save_memory`.
#[derive(Debug, Clone, Default)]
pub struct MemoryMessage {
    pub role: String,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub tool_name: Option<String>,
    pub tool_call_id: Option<String>,
}

/// Parameters for inserting a record; the store assigns the id.
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub text: String,
    pub importance: u8,
    pub timestamp: DateTime<Utc>,
    pub role: Option<String>,
    pub tool_name: Option<String>,
    pub tool_call_id: Option<String>,
}

/// A search hit: the hydrated record plus its similarity to the query.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub record: MemoryRecord,
    pub similarity: f32,
}

/// Render the text that is remembered and embedded for a message.
///
/// Provenance rides along inside the text so it survives embedding and
/// stays visible when the record is later injected into a prompt.
#[must_use]
pub fn build_memory_text(message: &MemoryMessage, now: DateTime<Utc>) -> String {
    let timestamp = message.timestamp.unwrap_or(now);
    let mut lines = vec![
        format!("time: {}", timestamp.to_rfc3339()),
        format!("role: {}", message.role),
    ];
    if let Some(ref tool) = message.tool_name {
        lines.push(format!("tool: {tool}"));
    }
    if let Some(ref call_id) = message.tool_call_id {
        lines.push(format!("call id: {call_id}"));
    }
    lines.push(format!("content: {}", message.content));
    lines.join("\n")
}
