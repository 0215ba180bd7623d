use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message identifier: a random 128-bit UUID (v4).
pub type MessageId = Uuid;

/// A single bulletin board post.
///
/// Messages are immutable once created. Every node that holds a message holds
/// exactly the same four fields; replication never rewrites any of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    #[cfg_attr(feature = "openapi", schema(value_type = uuid::Uuid))]
    pub id: MessageId,
    pub author: String,
    pub content: String,
    /// UTC ISO-8601 timestamp. Compared as a plain string, so ordering is
    /// only meaningful between timestamps written in the same format.
    pub timestamp: String,
}

impl Message {
    /// Build a new locally authored message with a fresh id and the current time.
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Message {
            id: Uuid::new_v4(),
            author: author.into(),
            content: content.into(),
            timestamp: now_timestamp(),
        }
    }
}

/// Current UTC time as fixed-width RFC 3339 with microseconds and a `Z` suffix,
/// e.g. `2025-03-01T12:00:00.123456Z`. Fixed width keeps lexicographic order
/// equal to chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
