use std::sync::Arc;

use chrono::Utc;
use conversation_ingestion_entity::{subtopics, topics};
use pretty_assertions::assert_eq;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use uuid::Uuid;

use super::{init_db, seed_conversation, ts, StubClassifier};
use crate::{
    hot_store::{memory::InMemoryMessageStore, HotMessage, MessageStore},
    repository,
    services::classification::{self, ClassificationResult},
    types::{ArchivedMessage, ConversationScope, Resolution},
};

async fn seed_topic(
    db: &DatabaseConnection,
    project_uuid: Uuid,
    name: &str,
    active: bool,
) -> topics::Model {
    topics::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        project_uuid: Set(project_uuid),
        name: Set(name.to_string()),
        description: Set(Some(format!("{name} topics"))),
        is_active: Set(active),
        created_at: Set(Utc::now().naive_utc()),
        updated_at: Set(Utc::now().naive_utc()),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn seed_subtopic(
    db: &DatabaseConnection,
    topic_uuid: Uuid,
    name: &str,
    active: bool,
) -> subtopics::Model {
    subtopics::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        topic_uuid: Set(topic_uuid),
        name: Set(name.to_string()),
        description: Set(None),
        is_active: Set(active),
        created_at: Set(Utc::now().naive_utc()),
        updated_at: Set(Utc::now().naive_utc()),
    }
    .insert(db)
    .await
    .unwrap()
}

#[tokio::test]
async fn classifies_from_hot_store_and_saves_result() {
    let db = init_db("classification_hot_store").await;
    let store = Arc::new(InMemoryMessageStore::new());
    let project_uuid = Uuid::new_v4();
    let channel_uuid = Uuid::new_v4();
    let conversation = seed_conversation(
        db.client().as_ref(),
        project_uuid,
        "whatsapp:+1",
        channel_uuid,
        Resolution::Resolved,
        ts("2024-01-01T10:00:00"),
    )
    .await;

    let topic = seed_topic(db.client().as_ref(), project_uuid, "billing", true).await;
    let subtopic = seed_subtopic(db.client().as_ref(), topic.uuid, "refunds", true).await;
    let inactive = seed_topic(db.client().as_ref(), project_uuid, "retired", false).await;
    seed_subtopic(db.client().as_ref(), topic.uuid, "retired-sub", false).await;

    let scope = ConversationScope::new(project_uuid, "whatsapp:+1", channel_uuid);
    for (index, text) in ["Hi", "I want a refund"].iter().enumerate() {
        store
            .store(
                &scope,
                HotMessage {
                    text: text.to_string(),
                    source: if index == 0 { "incoming" } else { "outgoing" }.to_string(),
                    created_at: format!("2024-01-01T12:00:0{index}Z"),
                },
                Resolution::InProgress.as_i16(),
                48,
            )
            .await
            .unwrap();
    }

    let classifier = StubClassifier::returning(ClassificationResult {
        topic_uuid: Some(topic.uuid),
        subtopic_uuid: Some(subtopic.uuid),
        confidence: Some(0.87),
    });

    classification::classify_conversation(
        &db.client(),
        store.as_ref(),
        &classifier,
        conversation.uuid,
    )
    .await
    .unwrap();

    let payloads = classifier.payloads.lock().await;
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload.language, "pt-br");
    assert_eq!(payload.conversation_uuid, conversation.uuid);
    // oldest first for the classifier
    assert_eq!(
        payload
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>(),
        ["Hi", "I want a refund"]
    );
    assert_eq!(payload.messages[0].sender, "incoming");
    // inactive topics and subtopics are not offered as context
    assert_eq!(payload.topics.len(), 1);
    assert_eq!(payload.topics[0].topic_uuid, topic.uuid);
    assert!(payload.topics[0].subtopics.iter().all(|s| s.name == "refunds"));
    assert!(payload
        .topics
        .iter()
        .all(|t| t.topic_uuid != inactive.uuid));

    let saved = repository::classifications::find(db.client().as_ref(), conversation.uuid)
        .await
        .unwrap()
        .expect("classification row should exist");
    assert_eq!(saved.topic_uuid, Some(topic.uuid));
    assert_eq!(saved.subtopic_uuid, Some(subtopic.uuid));
    assert!((saved.confidence - 0.87).abs() < f64::EPSILON);
}

#[tokio::test]
async fn falls_back_to_archived_messages_when_hot_store_is_empty() {
    let db = init_db("classification_archive_fallback").await;
    let store = Arc::new(InMemoryMessageStore::new());
    let conversation = seed_conversation(
        db.client().as_ref(),
        Uuid::new_v4(),
        "whatsapp:+1",
        Uuid::new_v4(),
        Resolution::Resolved,
        ts("2024-01-01T10:00:00"),
    )
    .await;
    repository::conversation_messages::upsert(
        db.client().as_ref(),
        conversation.uuid,
        &[ArchivedMessage {
            text: "archived hello".to_string(),
            source: "incoming".to_string(),
            created_at: "2024-01-01T12:00:00".to_string(),
        }],
    )
    .await
    .unwrap();

    let classifier = StubClassifier::returning(ClassificationResult::default());
    classification::classify_conversation(
        &db.client(),
        store.as_ref(),
        &classifier,
        conversation.uuid,
    )
    .await
    .unwrap();

    let payloads = classifier.payloads.lock().await;
    assert_eq!(payloads[0].messages.len(), 1);
    assert_eq!(payloads[0].messages[0].content, "archived hello");
}

#[tokio::test]
async fn unknown_topic_references_are_stored_as_null() {
    let db = init_db("classification_unknown_topic").await;
    let store = Arc::new(InMemoryMessageStore::new());
    let conversation = seed_conversation(
        db.client().as_ref(),
        Uuid::new_v4(),
        "whatsapp:+1",
        Uuid::new_v4(),
        Resolution::Resolved,
        ts("2024-01-01T10:00:00"),
    )
    .await;
    repository::conversation_messages::upsert(
        db.client().as_ref(),
        conversation.uuid,
        &[ArchivedMessage {
            text: "hello".to_string(),
            source: "incoming".to_string(),
            created_at: "2024-01-01T12:00:00".to_string(),
        }],
    )
    .await
    .unwrap();

    let classifier = StubClassifier::returning(ClassificationResult {
        topic_uuid: Some(Uuid::new_v4()),
        subtopic_uuid: Some(Uuid::new_v4()),
        confidence: None,
    });
    classification::classify_conversation(
        &db.client(),
        store.as_ref(),
        &classifier,
        conversation.uuid,
    )
    .await
    .unwrap();

    let saved = repository::classifications::find(db.client().as_ref(), conversation.uuid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.topic_uuid, None);
    assert_eq!(saved.subtopic_uuid, None);
    assert_eq!(saved.confidence, 0.0);
}

#[tokio::test]
async fn conversations_without_messages_are_skipped() {
    let db = init_db("classification_no_messages").await;
    let store = Arc::new(InMemoryMessageStore::new());
    let conversation = seed_conversation(
        db.client().as_ref(),
        Uuid::new_v4(),
        "whatsapp:+1",
        Uuid::new_v4(),
        Resolution::Resolved,
        ts("2024-01-01T10:00:00"),
    )
    .await;

    let classifier = StubClassifier::returning(ClassificationResult::default());
    classification::classify_conversation(
        &db.client(),
        store.as_ref(),
        &classifier,
        conversation.uuid,
    )
    .await
    .unwrap();

    assert!(classifier.payloads.lock().await.is_empty());
    assert!(
        repository::classifications::find(db.client().as_ref(), conversation.uuid)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn unknown_conversation_is_skipped() {
    let db = init_db("classification_unknown_conversation").await;
    let store = Arc::new(InMemoryMessageStore::new());
    let classifier = StubClassifier::returning(ClassificationResult::default());
    classification::classify_conversation(
        &db.client(),
        store.as_ref(),
        &classifier,
        Uuid::new_v4(),
    )
    .await
    .unwrap();
    assert!(classifier.payloads.lock().await.is_empty());
}
