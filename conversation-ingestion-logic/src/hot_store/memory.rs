use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::anyhow;
use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{sortable_timestamp, HotMessage, MessagePage, MessageStore};
use crate::{
    error::ServiceError,
    types::{ArchivedMessage, ConversationScope},
};

#[derive(Debug, Clone)]
struct StoredItem {
    message: ArchivedMessage,
    resolution_status: i16,
    expires_on: i64,
    written_at: i64,
}

/// Test double mirroring the hot store contract: sorted partitions,
/// newest-first reads, opaque cursors, and switchable failure injection
/// for the transient-error paths.
#[derive(Default)]
pub struct InMemoryMessageStore {
    partitions: Mutex<BTreeMap<String, BTreeMap<String, StoredItem>>>,
    fail_stores: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::Relaxed);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::Relaxed);
    }

    pub async fn len(&self, scope: &ConversationScope) -> usize {
        self.partitions
            .lock()
            .await
            .get(&scope.partition_key())
            .map(BTreeMap::len)
            .unwrap_or_default()
    }

    pub async fn sort_keys(&self, scope: &ConversationScope) -> Vec<String> {
        self.partitions
            .lock()
            .await
            .get(&scope.partition_key())
            .map(|partition| partition.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn resolution_statuses(&self, scope: &ConversationScope) -> Vec<i16> {
        self.partitions
            .lock()
            .await
            .get(&scope.partition_key())
            .map(|partition| {
                partition
                    .values()
                    .map(|item| item.resolution_status)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every (expiry, write instant) pair, for TTL invariant checks.
    pub async fn expiries(&self, scope: &ConversationScope) -> Vec<(i64, i64)> {
        self.partitions
            .lock()
            .await
            .get(&scope.partition_key())
            .map(|partition| {
                partition
                    .values()
                    .map(|item| (item.expires_on, item.written_at))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn store(
        &self,
        scope: &ConversationScope,
        message: HotMessage,
        resolution_status: i16,
        ttl_hours: i64,
    ) -> Result<(), ServiceError> {
        if self.fail_stores.load(Ordering::Relaxed) {
            return Err(ServiceError::HotStore(anyhow!("injected store failure")));
        }

        let now = Utc::now().timestamp();
        let sortable = sortable_timestamp(&message.created_at);
        let sort_key = format!("{sortable}#{}", Uuid::new_v4());
        self.partitions
            .lock()
            .await
            .entry(scope.partition_key())
            .or_default()
            .insert(
                sort_key,
                StoredItem {
                    message: ArchivedMessage {
                        text: message.text,
                        source: message.source,
                        created_at: sortable,
                    },
                    resolution_status,
                    expires_on: now + ttl_hours * 3600,
                    written_at: now,
                },
            );
        Ok(())
    }

    async fn get_messages(
        &self,
        scope: &ConversationScope,
        limit: i32,
        cursor: Option<String>,
    ) -> Result<MessagePage, ServiceError> {
        let start_after = cursor.as_deref().and_then(|cursor| {
            let decoded = BASE64_STANDARD
                .decode(cursor)
                .ok()
                .and_then(|raw| String::from_utf8(raw).ok());
            if decoded.is_none() {
                tracing::warn!(cursor, "invalid pagination cursor, ignoring");
            }
            decoded
        });

        let partitions = self.partitions.lock().await;
        let Some(partition) = partitions.get(&scope.partition_key()) else {
            return Ok(MessagePage {
                items: vec![],
                next_cursor: None,
            });
        };

        let mut items = vec![];
        let mut last_key = None;
        let mut remaining = partition
            .iter()
            .rev()
            .skip_while(|(key, _)| match &start_after {
                Some(cursor_key) => *key >= cursor_key,
                None => false,
            });
        for (key, item) in remaining.by_ref().take(limit as usize) {
            items.push(item.message.clone());
            last_key = Some(key.clone());
        }
        let has_more = remaining.next().is_some();

        Ok(MessagePage {
            items,
            next_cursor: has_more
                .then_some(last_key)
                .flatten()
                .map(|key| BASE64_STANDARD.encode(key)),
        })
    }

    async fn get_all_messages(
        &self,
        scope: &ConversationScope,
    ) -> Result<Vec<ArchivedMessage>, ServiceError> {
        Ok(self
            .partitions
            .lock()
            .await
            .get(&scope.partition_key())
            .map(|partition| {
                partition
                    .values()
                    .rev()
                    .map(|item| item.message.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_all(&self, scope: &ConversationScope) -> Result<usize, ServiceError> {
        if self.fail_deletes.load(Ordering::Relaxed) {
            return Err(ServiceError::HotStore(anyhow!("injected delete failure")));
        }
        Ok(self
            .partitions
            .lock()
            .await
            .remove(&scope.partition_key())
            .map(|partition| partition.len())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ConversationScope {
        ConversationScope::new(Uuid::new_v4(), "whatsapp:+1", Uuid::new_v4())
    }

    fn message(index: u32) -> HotMessage {
        HotMessage {
            text: format!("message {index}"),
            source: "incoming".to_string(),
            created_at: format!("2024-01-01T12:00:{index:02}Z"),
        }
    }

    #[tokio::test]
    async fn pages_newest_first_with_cursor_continuation() {
        let store = InMemoryMessageStore::new();
        let scope = scope();
        for index in 0..5 {
            store.store(&scope, message(index), 2, 48).await.unwrap();
        }

        let first = store.get_messages(&scope, 3, None).await.unwrap();
        assert_eq!(
            first.items.iter().map(|m| &m.text).collect::<Vec<_>>(),
            ["message 4", "message 3", "message 2"]
        );
        let cursor = first.next_cursor.expect("more pages expected");

        let second = store.get_messages(&scope, 3, Some(cursor)).await.unwrap();
        assert_eq!(
            second.items.iter().map(|m| &m.text).collect::<Vec<_>>(),
            ["message 1", "message 0"]
        );
        assert_eq!(second.next_cursor, None);
    }

    #[tokio::test]
    async fn invalid_cursor_is_ignored() {
        let store = InMemoryMessageStore::new();
        let scope = scope();
        store.store(&scope, message(0), 2, 48).await.unwrap();

        let page = store
            .get_messages(&scope, 10, Some("%%% not base64 %%%".to_string()))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn ttl_expiry_is_strictly_after_write_instant() {
        let store = InMemoryMessageStore::new();
        let scope = scope();
        store.store(&scope, message(0), 2, 48).await.unwrap();

        for (expires_on, written_at) in store.expiries(&scope).await {
            assert!(expires_on > written_at);
            assert_eq!(expires_on - written_at, 48 * 3600);
        }
    }
}
