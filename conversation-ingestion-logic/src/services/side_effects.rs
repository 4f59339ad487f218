use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::America::Sao_Paulo;
use conversation_ingestion_entity::conversations;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    clients::{data_lake::DATA_LAKE_EVENT_NAME, DataLakeEvent, DataLakeSink},
    error::ServiceError,
    hot_store::MessageStore,
    services::{
        migration,
        registry::{self, ConversationPatch},
    },
    settings::AgentSettings,
    types::ConversationScope,
};

pub const KEY_CSAT: &str = "weni_csat";
pub const KEY_NPS: &str = "weni_nps";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyKind {
    Csat,
    Nps,
}

impl SurveyKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            KEY_CSAT => Some(Self::Csat),
            KEY_NPS => Some(Self::Nps),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Csat => KEY_CSAT,
            Self::Nps => KEY_NPS,
        }
    }
}

/// Fans out the non-ingest effects of an event: CSAT/NPS conversation
/// updates plus data-lake events, and classification jobs on close.
pub struct SideEffectDispatcher {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn MessageStore>,
    data_lake: Arc<dyn DataLakeSink>,
    classification_tx: mpsc::UnboundedSender<Uuid>,
    agents: AgentSettings,
}

impl SideEffectDispatcher {
    pub fn new(
        db: Arc<DatabaseConnection>,
        store: Arc<dyn MessageStore>,
        data_lake: Arc<dyn DataLakeSink>,
        classification_tx: mpsc::UnboundedSender<Uuid>,
        agents: AgentSettings,
    ) -> Self {
        Self {
            db,
            store,
            data_lake,
            classification_tx,
            agents,
        }
    }

    /// Hands a closed conversation to the classification worker. The queue
    /// is unbounded and the worker logs its own failures, so this never
    /// blocks ingestion.
    pub fn enqueue_classification(&self, conversation_uuid: Uuid) {
        if self.classification_tx.send(conversation_uuid).is_err() {
            tracing::error!(
                %conversation_uuid,
                "classification worker is gone, dropping job"
            );
        }
    }

    /// Applies a CSAT/NPS value to the conversation and emits the
    /// corresponding data-lake event. Events without a value are skipped.
    pub async fn process_survey(
        &self,
        kind: SurveyKind,
        value: Option<&str>,
        conversation: &conversations::Model,
    ) -> Result<(), ServiceError> {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            tracing::warn!(key = kind.key(), "survey event missing value, skipping");
            return Ok(());
        };

        let mut conversation = conversation.clone();
        if let Some(channel_uuid) = conversation.channel_uuid {
            let scope = ConversationScope::new(
                conversation.project_uuid,
                conversation.contact_urn.clone(),
                channel_uuid,
            );
            let patch = match kind {
                SurveyKind::Csat => ConversationPatch {
                    csat: parse_score(value, kind),
                    ..Default::default()
                },
                SurveyKind::Nps => ConversationPatch {
                    nps: parse_score(value, kind),
                    ..Default::default()
                },
            };

            if let Some(outcome) = registry::update_fields(&self.db, &scope, patch).await? {
                if outcome.closed {
                    migration::migrate(&self.db, self.store.as_ref(), &outcome.conversation)
                        .await?;
                    self.enqueue_classification(outcome.conversation.uuid);
                }
                conversation = outcome.conversation;
            }
        }

        let event = self.build_event(kind, value, &conversation);
        event.validate()?;
        self.data_lake.send(&event).await?;

        tracing::info!(
            conversation_uuid = %conversation.uuid,
            key = kind.key(),
            value,
            "survey event sent to data lake"
        );
        Ok(())
    }

    fn build_event(
        &self,
        kind: SurveyKind,
        value: &str,
        conversation: &conversations::Model,
    ) -> DataLakeEvent {
        let agent_uuid = match kind {
            SurveyKind::Csat => &self.agents.csat_uuid,
            SurveyKind::Nps => &self.agents.nps_uuid,
        };

        let mut metadata = serde_json::json!({
            "agent_uuid": agent_uuid,
            "conversation_uuid": conversation.uuid.to_string(),
        });
        if let Some(start_date) = conversation.start_date {
            metadata["conversation_start_date"] =
                serde_json::Value::String(iso_utc(start_date));
        }
        if let Some(end_date) = conversation.end_date {
            metadata["conversation_end_date"] = serde_json::Value::String(iso_utc(end_date));
        }

        DataLakeEvent {
            event_name: DATA_LAKE_EVENT_NAME.to_string(),
            date: Utc::now().with_timezone(&Sao_Paulo).to_rfc3339(),
            project: conversation.project_uuid.to_string(),
            contact_urn: conversation.contact_urn.clone(),
            key: kind.key().to_string(),
            value_type: "string".to_string(),
            value: Some(value.to_string()),
            metadata,
        }
    }
}

fn parse_score<T: std::str::FromStr>(value: &str, kind: SurveyKind) -> Option<T> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(
            key = kind.key(),
            value,
            "non-numeric survey value, conversation row left unchanged"
        );
    }
    parsed
}

fn iso_utc(naive: chrono::NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).to_rfc3339()
}
