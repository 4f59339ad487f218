use conversation_ingestion_entity::{subtopics, topics};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

/// Active topics of a project with their active subtopics, the context
/// block sent to the remote classifier.
pub async fn list_active_with_subtopics<C: ConnectionTrait>(
    db: &C,
    project_uuid: Uuid,
) -> Result<Vec<(topics::Model, Vec<subtopics::Model>)>, DbErr> {
    let topic_rows = topics::Entity::find()
        .filter(topics::Column::ProjectUuid.eq(project_uuid))
        .filter(topics::Column::IsActive.eq(true))
        .all(db)
        .await?;

    let topic_uuids: Vec<Uuid> = topic_rows.iter().map(|t| t.uuid).collect();
    let subtopic_rows = subtopics::Entity::find()
        .filter(subtopics::Column::TopicUuid.is_in(topic_uuids))
        .filter(subtopics::Column::IsActive.eq(true))
        .all(db)
        .await?;

    Ok(topic_rows
        .into_iter()
        .map(|topic| {
            let subs = subtopic_rows
                .iter()
                .filter(|sub| sub.topic_uuid == topic.uuid)
                .cloned()
                .collect();
            (topic, subs)
        })
        .collect())
}

pub async fn topic_exists<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<bool, DbErr> {
    Ok(topics::Entity::find_by_id(uuid).count(db).await? > 0)
}

pub async fn subtopic_exists<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<bool, DbErr> {
    Ok(subtopics::Entity::find_by_id(uuid).count(db).await? > 0)
}
