use chrono::{NaiveDate, NaiveDateTime, Utc};
use conversation_ingestion_entity::conversations::{ActiveModel, Column, Entity, Model};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbBackend,
    DbErr, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Statement,
};
use uuid::Uuid;

use crate::types::{ChannelResolutionCount, Resolution};

pub struct NewConversation {
    pub project_uuid: Uuid,
    pub contact_urn: String,
    pub contact_name: Option<String>,
    pub channel_uuid: Uuid,
    pub external_id: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub has_chats_room: bool,
    pub resolution: Resolution,
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewConversation) -> Result<Model, DbErr> {
    let model = ActiveModel {
        uuid: Set(Uuid::new_v4()),
        project_uuid: Set(new.project_uuid),
        contact_urn: Set(new.contact_urn),
        contact_name: Set(new.contact_name),
        channel_uuid: Set(Some(new.channel_uuid)),
        external_id: Set(new.external_id),
        start_date: Set(new.start_date),
        end_date: Set(new.end_date),
        has_chats_room: Set(new.has_chats_room),
        csat: Set(None),
        nps: Set(None),
        resolution: Set(new.resolution.as_i16()),
        created_at: Set(Utc::now().naive_utc()),
    };
    model.insert(db).await
}

/// All in-progress conversations for the registry tuple, most recent
/// first. More than one element means the single-active invariant has been
/// violated and the caller must heal it.
pub async fn find_active<C: ConnectionTrait>(
    db: &C,
    project_uuid: Uuid,
    contact_urn: &str,
    channel_uuid: Uuid,
) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .filter(Column::ProjectUuid.eq(project_uuid))
        .filter(Column::ContactUrn.eq(contact_urn))
        .filter(Column::ChannelUuid.eq(channel_uuid))
        .filter(Column::Resolution.eq(Resolution::InProgress.as_i16()))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await
}

pub async fn find_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id(uuid).one(db).await
}

pub async fn find_latest<C: ConnectionTrait>(
    db: &C,
    project_uuid: Uuid,
    contact_urn: &str,
    channel_uuid: Uuid,
) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::ProjectUuid.eq(project_uuid))
        .filter(Column::ContactUrn.eq(contact_urn))
        .filter(Column::ChannelUuid.eq(channel_uuid))
        .order_by_desc(Column::CreatedAt)
        .one(db)
        .await
}

pub async fn mark_unclassified<C: ConnectionTrait>(
    db: &C,
    uuids: Vec<Uuid>,
) -> Result<(), DbErr> {
    if uuids.is_empty() {
        return Ok(());
    }
    Entity::update_many()
        .col_expr(
            Column::Resolution,
            Expr::value(Resolution::Unclassified.as_i16()),
        )
        .filter(Column::Uuid.is_in(uuids))
        .exec(db)
        .await?;
    Ok(())
}

/// Projects that opened at least one conversation on the given day; the
/// billing rollup iterates over these.
pub async fn projects_with_conversations_on<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
) -> Result<Vec<Uuid>, DbErr> {
    let (day_start, day_end) = day_bounds(date);
    Entity::find()
        .select_only()
        .column(Column::ProjectUuid)
        .filter(Column::CreatedAt.gte(day_start))
        .filter(Column::CreatedAt.lt(day_end))
        .distinct()
        .into_tuple::<Uuid>()
        .all(db)
        .await
}

#[derive(FromQueryResult)]
struct CountsRow {
    channel_uuid: Uuid,
    resolved: i64,
    unresolved: i64,
    has_chats_rooms: i64,
    unclassified: i64,
}

impl From<CountsRow> for ChannelResolutionCount {
    fn from(row: CountsRow) -> Self {
        Self {
            channel_uuid: row.channel_uuid,
            resolved: row.resolved as u64,
            unresolved: row.unresolved as u64,
            has_chats_rooms: row.has_chats_rooms as u64,
            unclassified: row.unclassified as u64,
        }
    }
}

const COUNTS_SELECT: &str = r#"
    SELECT "channel_uuid",
        COUNT(*) FILTER (WHERE "resolution" = 0) AS "resolved",
        COUNT(*) FILTER (WHERE "resolution" = 1) AS "unresolved",
        COUNT(*) FILTER (WHERE "resolution" = 4 OR "has_chats_room") AS "has_chats_rooms",
        COUNT(*) FILTER (WHERE "resolution" = 3) AS "unclassified"
    FROM "conversations"
    WHERE "project_uuid" = $1
        AND "channel_uuid" IS NOT NULL
        AND "created_at" >= $2
        AND "created_at" < $3
"#;

/// One grouped scan over the target day, per-channel tallies.
pub async fn count_resolutions_by_channel<C: ConnectionTrait>(
    db: &C,
    project_uuid: Uuid,
    date: NaiveDate,
) -> Result<Vec<ChannelResolutionCount>, DbErr> {
    let (day_start, day_end) = day_bounds(date);
    let rows = CountsRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!("{COUNTS_SELECT} GROUP BY \"channel_uuid\""),
        [project_uuid.into(), day_start.into(), day_end.into()],
    ))
    .all(db)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn count_resolutions_for_channel<C: ConnectionTrait>(
    db: &C,
    project_uuid: Uuid,
    channel_uuid: Uuid,
    date: NaiveDate,
) -> Result<ChannelResolutionCount, DbErr> {
    let (day_start, day_end) = day_bounds(date);
    let row = CountsRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!("{COUNTS_SELECT} AND \"channel_uuid\" = $4 GROUP BY \"channel_uuid\""),
        [
            project_uuid.into(),
            day_start.into(),
            day_end.into(),
            channel_uuid.into(),
        ],
    ))
    .one(db)
    .await?;
    Ok(row
        .map(Into::into)
        .unwrap_or_else(|| ChannelResolutionCount::empty(channel_uuid)))
}

fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    (day_start, day_start + chrono::Duration::days(1))
}
