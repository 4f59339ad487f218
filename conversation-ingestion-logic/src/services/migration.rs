use conversation_ingestion_entity::conversations;
use sea_orm::DatabaseConnection;

use crate::{
    error::ServiceError, hot_store::MessageStore, metrics, repository, types::ConversationScope,
};

/// Drains the hot-store partition of a closed conversation into the
/// durable archive, then purges the partition.
///
/// The archive upsert is the transactional step: its failure aborts the
/// migration and propagates so the event is redelivered. The purge is
/// best-effort, the hot store garbage-collects leftovers via TTL.
pub async fn migrate(
    db: &DatabaseConnection,
    store: &dyn MessageStore,
    conversation: &conversations::Model,
) -> Result<usize, ServiceError> {
    let Some(channel_uuid) = conversation.channel_uuid else {
        tracing::warn!(
            conversation_uuid = %conversation.uuid,
            "conversation has no channel, nothing to migrate"
        );
        return Ok(0);
    };
    let scope = ConversationScope::new(
        conversation.project_uuid,
        conversation.contact_urn.clone(),
        channel_uuid,
    );

    let messages = store.get_all_messages(&scope).await?;
    if messages.is_empty() {
        tracing::info!(
            conversation_uuid = %conversation.uuid,
            "no messages to migrate"
        );
        return Ok(0);
    }

    repository::conversation_messages::upsert(db, conversation.uuid, &messages).await?;

    match store.delete_all(&scope).await {
        Ok(deleted) => {
            tracing::debug!(
                conversation_uuid = %conversation.uuid,
                deleted,
                "hot store partition purged"
            );
        }
        Err(err) => {
            tracing::warn!(
                conversation_uuid = %conversation.uuid,
                error = ?err,
                "hot store cleanup failed, items will expire via TTL"
            );
        }
    }

    metrics::CONVERSATIONS_MIGRATED.inc();
    tracing::info!(
        conversation_uuid = %conversation.uuid,
        messages_count = messages.len(),
        "migration completed"
    );
    Ok(messages.len())
}
