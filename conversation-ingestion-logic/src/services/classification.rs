use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    hot_store::{MessageStore, DEFAULT_PAGE_LIMIT},
    repository,
    settings::ClassificationSettings,
    types::ConversationScope,
};

const CLASSIFICATION_LANGUAGE: &str = "pt-br";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassificationPayload {
    pub project_uuid: Uuid,
    pub conversation_uuid: Uuid,
    pub messages: Vec<PayloadMessage>,
    pub topics: Vec<PayloadTopic>,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PayloadMessage {
    pub sender: String,
    pub timestamp: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PayloadTopic {
    pub topic_uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub subtopics: Vec<PayloadSubtopic>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PayloadSubtopic {
    pub subtopic_uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub topic_uuid: Option<Uuid>,
    pub subtopic_uuid: Option<Uuid>,
    pub confidence: Option<f64>,
}

/// The remote classification function, invoked by reference.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        payload: &ClassificationPayload,
    ) -> Result<ClassificationResult, ServiceError>;
}

pub struct LambdaClassifier {
    client: aws_sdk_lambda::Client,
    function_name: String,
}

impl LambdaClassifier {
    pub fn new(sdk_config: &aws_config::SdkConfig, settings: &ClassificationSettings) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(sdk_config),
            function_name: settings.lambda_name.clone(),
        }
    }
}

#[async_trait]
impl Classifier for LambdaClassifier {
    async fn classify(
        &self,
        payload: &ClassificationPayload,
    ) -> Result<ClassificationResult, ServiceError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| ServiceError::Internal(anyhow::Error::new(e)))?;
        let response = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApi(e.into()))?;

        let blob = response.payload.ok_or_else(|| {
            ServiceError::ExternalApi(anyhow::anyhow!("classifier returned no payload"))
        })?;
        serde_json::from_slice(blob.as_ref())
            .map_err(|e| ServiceError::ExternalApi(anyhow::Error::new(e)))
    }
}

pub fn channel() -> (mpsc::UnboundedSender<Uuid>, mpsc::UnboundedReceiver<Uuid>) {
    mpsc::unbounded_channel()
}

/// Drains classification jobs enqueued on conversation close. Failures
/// are logged and the job dropped; classification is best-effort.
pub struct ClassificationWorker {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn MessageStore>,
    classifier: Arc<dyn Classifier>,
    rx: mpsc::UnboundedReceiver<Uuid>,
}

impl ClassificationWorker {
    pub fn new(
        db: Arc<DatabaseConnection>,
        store: Arc<dyn MessageStore>,
        classifier: Arc<dyn Classifier>,
        rx: mpsc::UnboundedReceiver<Uuid>,
    ) -> Self {
        Self {
            db,
            store,
            classifier,
            rx,
        }
    }

    pub async fn run(mut self) {
        while let Some(conversation_uuid) = self.rx.recv().await {
            tracing::info!(%conversation_uuid, "starting classification");
            if let Err(err) = classify_conversation(
                &self.db,
                self.store.as_ref(),
                self.classifier.as_ref(),
                conversation_uuid,
            )
            .await
            {
                tracing::error!(
                    %conversation_uuid,
                    error = ?err,
                    "failed to classify conversation"
                );
            }
        }
        tracing::info!("classification worker stopped");
    }
}

/// Reads the conversation's messages (hot store first, archive fallback),
/// invokes the classifier, and upserts the classification row.
pub async fn classify_conversation(
    db: &DatabaseConnection,
    store: &dyn MessageStore,
    classifier: &dyn Classifier,
    conversation_uuid: Uuid,
) -> Result<(), ServiceError> {
    let Some(conversation) =
        repository::conversations::find_by_uuid(db, conversation_uuid).await?
    else {
        tracing::warn!(%conversation_uuid, "conversation not found, skipping classification");
        return Ok(());
    };

    let messages = conversation_messages(db, store, &conversation).await?;
    if messages.is_empty() {
        tracing::warn!(%conversation_uuid, "no messages found, skipping classification");
        return Ok(());
    }

    let topics = repository::topics::list_active_with_subtopics(db, conversation.project_uuid)
        .await?
        .into_iter()
        .map(|(topic, subtopics)| PayloadTopic {
            topic_uuid: topic.uuid,
            name: topic.name,
            description: topic.description,
            subtopics: subtopics
                .into_iter()
                .map(|subtopic| PayloadSubtopic {
                    subtopic_uuid: subtopic.uuid,
                    name: subtopic.name,
                    description: subtopic.description,
                })
                .collect(),
        })
        .collect();

    let payload = ClassificationPayload {
        project_uuid: conversation.project_uuid,
        conversation_uuid,
        messages,
        topics,
        language: CLASSIFICATION_LANGUAGE.to_string(),
    };

    let result = classifier.classify(&payload).await?;

    // Only reference topics this service actually knows about.
    let topic_uuid = match result.topic_uuid {
        Some(uuid) if repository::topics::topic_exists(db, uuid).await? => Some(uuid),
        _ => None,
    };
    let subtopic_uuid = match result.subtopic_uuid {
        Some(uuid) if repository::topics::subtopic_exists(db, uuid).await? => Some(uuid),
        _ => None,
    };

    repository::classifications::upsert(
        db,
        conversation_uuid,
        topic_uuid,
        subtopic_uuid,
        result.confidence.unwrap_or(0.0),
    )
    .await?;

    tracing::info!(
        %conversation_uuid,
        topic_uuid = ?topic_uuid,
        subtopic_uuid = ?subtopic_uuid,
        "classification saved"
    );
    Ok(())
}

/// Hot store is the source of truth while items are still alive; the
/// archived list is the fallback after TTL cleanup.
async fn conversation_messages(
    db: &DatabaseConnection,
    store: &dyn MessageStore,
    conversation: &conversation_ingestion_entity::conversations::Model,
) -> Result<Vec<PayloadMessage>, ServiceError> {
    let mut archived = vec![];

    if let Some(channel_uuid) = conversation.channel_uuid {
        let scope = ConversationScope::new(
            conversation.project_uuid,
            conversation.contact_urn.clone(),
            channel_uuid,
        );
        match store.get_messages(&scope, DEFAULT_PAGE_LIMIT, None).await {
            Ok(page) => {
                // newest-first page, oldest-first payload
                archived = page.items.into_iter().rev().collect();
            }
            Err(err) => {
                tracing::warn!(
                    conversation_uuid = %conversation.uuid,
                    error = ?err,
                    "failed to fetch messages from hot store, falling back to archive"
                );
            }
        }
    }

    if archived.is_empty() {
        archived = repository::conversation_messages::find_messages(db, conversation.uuid).await?;
    }

    Ok(archived
        .into_iter()
        .map(|message| PayloadMessage {
            sender: if message.source.is_empty() {
                "unknown".to_string()
            } else {
                message.source
            },
            timestamp: message.created_at,
            content: message.text,
        })
        .collect())
}
