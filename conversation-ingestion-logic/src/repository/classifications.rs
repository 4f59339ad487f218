use chrono::Utc;
use conversation_ingestion_entity::conversation_classifications::{
    ActiveModel, Column, Entity, Model,
};
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ConnectionTrait, DbErr, EntityTrait,
};
use uuid::Uuid;

pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    conversation_uuid: Uuid,
    topic_uuid: Option<Uuid>,
    subtopic_uuid: Option<Uuid>,
    confidence: f64,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let model = ActiveModel {
        conversation_uuid: Set(conversation_uuid),
        topic_uuid: Set(topic_uuid),
        subtopic_uuid: Set(subtopic_uuid),
        confidence: Set(confidence),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Entity::insert(model)
        .on_conflict(
            OnConflict::column(Column::ConversationUuid)
                .update_columns([
                    Column::TopicUuid,
                    Column::SubtopicUuid,
                    Column::Confidence,
                    Column::UpdatedAt,
                ])
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
