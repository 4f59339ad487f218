use chrono::Utc;
use conversation_ingestion_entity::projects::{ActiveModel, Column, Entity, Model};
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ConnectionTrait, DbErr, EntityTrait,
};
use uuid::Uuid;

/// Creates the project on first sight; an existing row is left untouched
/// (projects are immutable for this service).
pub async fn upsert<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Model, DbErr> {
    let model = ActiveModel {
        uuid: Set(uuid),
        name: Set(None),
        created_at: Set(Utc::now().naive_utc()),
    };

    match Entity::insert(model)
        .on_conflict(OnConflict::column(Column::Uuid).do_nothing().to_owned())
        .exec(db)
        .await
    {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(err) => return Err(err),
    }

    Entity::find_by_id(uuid)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("project {uuid}")))
}
