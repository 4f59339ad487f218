use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    error::ServiceError,
    types::{ArchivedMessage, ConversationScope},
};

pub mod dynamo;
#[cfg(test)]
pub mod memory;

pub use dynamo::DynamoMessageStore;

pub const DEFAULT_PAGE_LIMIT: i32 = 50;

/// A message about to be written to the hot store; `created_at` is the raw
/// ISO string from the event, normalized at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotMessage {
    pub text: String,
    pub source: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    pub items: Vec<ArchivedMessage>,
    pub next_cursor: Option<String>,
}

/// TTL-bound storage of in-flight messages, keyed by the conversation
/// partition key. Callers gate writes on the owning conversation being in
/// progress; the store itself does not know about conversations.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn store(
        &self,
        scope: &ConversationScope,
        message: HotMessage,
        resolution_status: i16,
        ttl_hours: i64,
    ) -> Result<(), ServiceError>;

    /// Newest-first page of messages with an opaque continuation cursor.
    /// Invalid cursors are logged and ignored.
    async fn get_messages(
        &self,
        scope: &ConversationScope,
        limit: i32,
        cursor: Option<String>,
    ) -> Result<MessagePage, ServiceError>;

    /// Walks the whole partition, newest first.
    async fn get_all_messages(
        &self,
        scope: &ConversationScope,
    ) -> Result<Vec<ArchivedMessage>, ServiceError>;

    /// Removes every item in the partition, returning the deleted count.
    async fn delete_all(&self, scope: &ConversationScope) -> Result<usize, ServiceError>;
}

/// Normalizes an event timestamp into the lexicographically sortable
/// `YYYY-MM-DDTHH:MM:SS` UTC form used for the range key. Unparsable
/// values keep their residual after stripping common offset suffixes.
pub fn sortable_timestamp(created_at: &str) -> String {
    let normalized = created_at.replace('Z', "+00:00");
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%Y-%m-%dT%H:%M:%S").to_string();
    }
    tracing::warn!(created_at, "failed to parse timestamp, storing stripped value");
    created_at.replace('Z', "").replace("+00:00", "")
}
