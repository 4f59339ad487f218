use std::sync::Arc;

use async_trait::async_trait;
use blockscout_service_launcher::test_database::TestDbGuard;
use chrono::NaiveDateTime;
use conversation_ingestion_entity::conversations;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::{
    clients::{DataLakeEvent, DataLakeSink},
    error::ServiceError,
    hot_store::memory::InMemoryMessageStore,
    queue::RawMessage,
    services::{
        classification::{ClassificationPayload, ClassificationResult, Classifier},
        pipeline::IngestionPipeline,
        side_effects::SideEffectDispatcher,
    },
    settings::AgentSettings,
    types::Resolution,
};

mod classification;
mod resolution_counter;

pub async fn init_db(test_name: &str) -> TestDbGuard {
    TestDbGuard::new::<::migration::Migrator>(test_name).await
}

pub const AGENT_CSAT: &str = "agent-csat-uuid";
pub const AGENT_NPS: &str = "agent-nps-uuid";

#[derive(Default)]
pub struct RecordingDataLakeSink {
    pub events: Mutex<Vec<DataLakeEvent>>,
}

#[async_trait]
impl DataLakeSink for RecordingDataLakeSink {
    async fn send(&self, event: &DataLakeEvent) -> Result<(), ServiceError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

pub struct StubClassifier {
    pub result: ClassificationResult,
    pub payloads: Mutex<Vec<ClassificationPayload>>,
}

impl StubClassifier {
    pub fn returning(result: ClassificationResult) -> Self {
        Self {
            result,
            payloads: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(
        &self,
        payload: &ClassificationPayload,
    ) -> Result<ClassificationResult, ServiceError> {
        self.payloads.lock().await.push(payload.clone());
        Ok(self.result.clone())
    }
}

/// Pipeline plus observable collaborators, wired the way the server does
/// it but against in-memory seams.
pub struct TestEnv {
    pub db: TestDbGuard,
    pub store: Arc<InMemoryMessageStore>,
    pub sink: Arc<RecordingDataLakeSink>,
    pub classification_rx: mpsc::UnboundedReceiver<Uuid>,
    pub pipeline: IngestionPipeline,
}

pub async fn test_env(test_name: &str) -> TestEnv {
    let db = init_db(test_name).await;
    let store = Arc::new(InMemoryMessageStore::new());
    let sink = Arc::new(RecordingDataLakeSink::default());
    let (classification_tx, classification_rx) = mpsc::unbounded_channel();

    let side_effects = SideEffectDispatcher::new(
        db.client(),
        store.clone(),
        sink.clone(),
        classification_tx,
        AgentSettings {
            csat_uuid: AGENT_CSAT.to_string(),
            nps_uuid: AGENT_NPS.to_string(),
        },
    );
    let pipeline = IngestionPipeline::new(db.client(), store.clone(), side_effects, 48);

    TestEnv {
        db,
        store,
        sink,
        classification_rx,
        pipeline,
    }
}

pub fn raw_message(event_type: &str, body: serde_json::Value, group_id: Option<&str>) -> RawMessage {
    RawMessage {
        message_id: Uuid::new_v4().to_string(),
        receipt_handle: format!("rh-{}", Uuid::new_v4()),
        body: body.to_string(),
        event_type: Some(event_type.to_string()),
        group_id: group_id.map(str::to_string),
    }
}

pub fn message_received_body(
    project_uuid: Uuid,
    contact_urn: &str,
    channel_uuid: Option<Uuid>,
    text: &str,
    created_at: &str,
) -> serde_json::Value {
    json!({
        "correlation_id": Uuid::new_v4().to_string(),
        "data": {
            "project_uuid": project_uuid.to_string(),
            "contact_urn": contact_urn,
            "channel_uuid": channel_uuid.map(|c| c.to_string()),
            "message": {
                "id": Uuid::new_v4().to_string(),
                "text": text,
                "source": "incoming",
                "contact_name": "Ana",
                "created_at": created_at,
            }
        }
    })
}

pub fn window_body(
    project_uuid: Uuid,
    contact_urn: &str,
    channel_uuid: Uuid,
    has_chats_room: bool,
) -> serde_json::Value {
    json!({
        "correlation_id": Uuid::new_v4().to_string(),
        "data": {
            "project_uuid": project_uuid.to_string(),
            "contact_urn": contact_urn,
            "channel_uuid": channel_uuid.to_string(),
            "external_id": "ext-1",
            "start": "2024-01-01T12:00:00Z",
            "end": "2024-01-02T12:00:00Z",
            "has_chats_room": has_chats_room,
            "name": "Ana",
        }
    })
}

/// Inserts a conversation row directly, bypassing the registry, so tests
/// can control `created_at` and pre-existing state.
pub async fn seed_conversation(
    db: &DatabaseConnection,
    project_uuid: Uuid,
    contact_urn: &str,
    channel_uuid: Uuid,
    resolution: Resolution,
    created_at: NaiveDateTime,
) -> conversations::Model {
    crate::repository::projects::upsert(db, project_uuid)
        .await
        .unwrap();
    conversations::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        project_uuid: Set(project_uuid),
        contact_urn: Set(contact_urn.to_string()),
        contact_name: Set(Some("Ana".to_string())),
        channel_uuid: Set(Some(channel_uuid)),
        external_id: Set(None),
        start_date: Set(Some(created_at)),
        end_date: Set(Some(created_at + chrono::Duration::hours(24))),
        has_chats_room: Set(false),
        csat: Set(None),
        nps: Set(None),
        resolution: Set(resolution.as_i16()),
        created_at: Set(created_at),
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").unwrap()
}
