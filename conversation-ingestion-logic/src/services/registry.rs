use chrono::{Duration, Utc};
use conversation_ingestion_entity::conversations;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, IntoActiveModel, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    events::WindowEvent,
    repository,
    repository::conversations::NewConversation,
    types::{ConversationScope, Resolution},
};

/// Default conversation window when a message opens one.
const DEFAULT_WINDOW_HOURS: i64 = 24;

#[derive(Debug)]
pub struct WindowOutcome {
    pub conversation: conversations::Model,
    /// The window transition took the conversation out of in-progress.
    pub closed: bool,
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub conversation: conversations::Model,
    pub closed: bool,
}

/// Targeted attribute writes for [`update_fields`]; `None` leaves the
/// column untouched.
#[derive(Debug, Default, Clone)]
pub struct ConversationPatch {
    pub contact_name: Option<String>,
    pub csat: Option<i16>,
    pub nps: Option<i32>,
    pub resolution: Option<Resolution>,
}

/// Finds or creates the single active conversation for the tuple.
///
/// Without a channel no conversation can exist; the observation is logged
/// and `None` returned so the caller still acks the message. When several
/// in-progress rows are found the most recent wins and the rest are
/// demoted to unclassified, all inside one transaction.
pub async fn ensure_active(
    db: &DatabaseConnection,
    project_uuid: Uuid,
    contact_urn: &str,
    contact_name: Option<&str>,
    channel_uuid: Option<Uuid>,
) -> Result<Option<conversations::Model>, ServiceError> {
    let Some(channel_uuid) = channel_uuid else {
        tracing::warn!(
            %project_uuid,
            contact_urn,
            "conversation not created: channel_uuid is missing"
        );
        return Ok(None);
    };

    let txn = db.begin().await?;
    repository::projects::upsert(&txn, project_uuid).await?;

    let mut active =
        repository::conversations::find_active(&txn, project_uuid, contact_urn, channel_uuid)
            .await?;

    let conversation = match active.len() {
        0 => {
            let now = Utc::now().naive_utc();
            repository::conversations::create(
                &txn,
                NewConversation {
                    project_uuid,
                    contact_urn: contact_urn.to_string(),
                    contact_name: Some(contact_name.unwrap_or_default().to_string()),
                    channel_uuid,
                    external_id: None,
                    start_date: Some(now),
                    end_date: Some(now + Duration::hours(DEFAULT_WINDOW_HOURS)),
                    has_chats_room: false,
                    resolution: Resolution::InProgress,
                },
            )
            .await?
        }
        1 => active.remove(0),
        _ => {
            let keep = active.remove(0);
            let demoted: Vec<Uuid> = active.iter().map(|c| c.uuid).collect();
            tracing::warn!(
                %project_uuid,
                contact_urn,
                %channel_uuid,
                keep = %keep.uuid,
                demoted = ?demoted,
                "multiple active conversations found, keeping the most recent"
            );
            repository::conversations::mark_unclassified(&txn, demoted).await?;
            keep
        }
    };

    txn.commit().await?;
    Ok(Some(conversation))
}

/// Applies a conversation-window transition: updates the most recent
/// conversation for the tuple or creates one, and reports whether the
/// transition closed it. `has_chats_room` forces the has-chat-room
/// resolution; otherwise the current resolution is preserved.
pub async fn apply_window(
    db: &DatabaseConnection,
    event: &WindowEvent,
) -> Result<Option<WindowOutcome>, ServiceError> {
    let Some(channel_uuid) = event.channel_uuid else {
        tracing::warn!(
            correlation_id = %event.correlation_id,
            project_uuid = %event.project_uuid,
            contact_urn = %event.contact_urn,
            "channel_uuid is missing, cannot process window event"
        );
        return Ok(None);
    };

    let txn = db.begin().await?;
    repository::projects::upsert(&txn, event.project_uuid).await?;

    let existing = repository::conversations::find_latest(
        &txn,
        event.project_uuid,
        &event.contact_urn,
        channel_uuid,
    )
    .await?;

    let resolution = if event.has_chats_room {
        Resolution::HasChatRoom.as_i16()
    } else {
        existing
            .as_ref()
            .map(|c| c.resolution)
            .unwrap_or(Resolution::InProgress.as_i16())
    };

    let was_in_progress = existing
        .as_ref()
        .is_some_and(|c| c.resolution == Resolution::InProgress.as_i16());
    let will_be_closed = resolution != Resolution::InProgress.as_i16();

    let conversation = match existing {
        Some(model) => {
            let mut active = model.clone().into_active_model();
            if let Some(external_id) = &event.external_id {
                active.external_id = Set(Some(external_id.clone()));
            }
            if let Some(start_date) = event.start_date {
                active.start_date = Set(Some(start_date));
            }
            if let Some(end_date) = event.end_date {
                active.end_date = Set(Some(end_date));
            }
            if let Some(contact_name) = &event.contact_name {
                active.contact_name = Set(Some(contact_name.clone()));
            }
            active.has_chats_room = Set(event.has_chats_room);
            active.resolution = Set(resolution);
            active.update(&txn).await?
        }
        None => {
            repository::conversations::create(
                &txn,
                NewConversation {
                    project_uuid: event.project_uuid,
                    contact_urn: event.contact_urn.clone(),
                    contact_name: Some(event.contact_name.clone().unwrap_or_default()),
                    channel_uuid,
                    external_id: event.external_id.clone(),
                    start_date: event.start_date,
                    end_date: event.end_date,
                    has_chats_room: event.has_chats_room,
                    resolution: Resolution::from_i16(resolution)
                        .unwrap_or(Resolution::InProgress),
                },
            )
            .await?
        }
    };

    txn.commit().await?;

    tracing::info!(
        correlation_id = %event.correlation_id,
        conversation_uuid = %conversation.uuid,
        resolution = Resolution::label_of(resolution),
        has_chats_room = event.has_chats_room,
        "conversation window applied"
    );

    Ok(Some(WindowOutcome {
        conversation,
        closed: was_in_progress && will_be_closed,
    }))
}

/// Applies attribute writes to the most recent conversation of the scope,
/// reporting whether a resolution write closed it so migration and the
/// classification enqueue can run in the same logical unit.
pub async fn update_fields(
    db: &DatabaseConnection,
    scope: &ConversationScope,
    patch: ConversationPatch,
) -> Result<Option<UpdateOutcome>, ServiceError> {
    let txn = db.begin().await?;

    let Some(model) = repository::conversations::find_latest(
        &txn,
        scope.project_uuid,
        &scope.contact_urn,
        scope.channel_uuid,
    )
    .await?
    else {
        tracing::warn!(
            project_uuid = %scope.project_uuid,
            contact_urn = %scope.contact_urn,
            channel_uuid = %scope.channel_uuid,
            "conversation not found for update"
        );
        txn.commit().await?;
        return Ok(None);
    };

    let was_in_progress = model.resolution == Resolution::InProgress.as_i16();

    let mut active = model.into_active_model();
    if let Some(contact_name) = patch.contact_name {
        active.contact_name = Set(Some(contact_name));
    }
    if let Some(csat) = patch.csat {
        active.csat = Set(Some(csat));
    }
    if let Some(nps) = patch.nps {
        active.nps = Set(Some(nps));
    }
    if let Some(resolution) = patch.resolution {
        active.resolution = Set(resolution.as_i16());
    }
    let conversation = active.update(&txn).await?;

    txn.commit().await?;

    let closed =
        was_in_progress && conversation.resolution != Resolution::InProgress.as_i16();
    Ok(Some(UpdateOutcome {
        conversation,
        closed,
    }))
}
