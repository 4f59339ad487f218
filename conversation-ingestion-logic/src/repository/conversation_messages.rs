use chrono::Utc;
use conversation_ingestion_entity::conversation_messages::{ActiveModel, Column, Entity, Model};
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ConnectionTrait, DbErr, EntityTrait,
};
use uuid::Uuid;

use crate::types::ArchivedMessage;

/// Writes (or replaces) the archived message list for a conversation.
/// Re-running a migration overwrites with the same content, so the
/// operation is idempotent.
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    conversation_uuid: Uuid,
    messages: &[ArchivedMessage],
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let model = ActiveModel {
        conversation_uuid: Set(conversation_uuid),
        messages: Set(serde_json::to_value(messages).map_err(|e| DbErr::Json(e.to_string()))?),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Entity::insert(model)
        .on_conflict(
            OnConflict::column(Column::ConversationUuid)
                .update_columns([Column::Messages, Column::UpdatedAt])
                .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    conversation_uuid: Uuid,
) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(conversation_uuid).one(db).await
}

/// The archived list decoded back into messages; absent rows decode to an
/// empty list.
pub async fn find_messages<C: ConnectionTrait>(
    db: &C,
    conversation_uuid: Uuid,
) -> Result<Vec<ArchivedMessage>, DbErr> {
    let Some(model) = find(db, conversation_uuid).await? else {
        return Ok(vec![]);
    };
    serde_json::from_value(model.messages).map_err(|e| DbErr::Json(e.to_string()))
}
