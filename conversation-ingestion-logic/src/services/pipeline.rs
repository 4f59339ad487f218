use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    error::ServiceError,
    events::{Event, MessageEvent, WindowEvent},
    hot_store::{HotMessage, MessageStore},
    metrics,
    queue::RawMessage,
    services::{
        migration, registry,
        side_effects::{SideEffectDispatcher, SurveyKind},
    },
    types::{ConversationScope, MessageDirection, Resolution},
};

/// Resolution of a single raw message: ack, ack-as-poison, or leave for
/// redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    Rejected,
    Deferred,
}

impl Outcome {
    pub fn should_delete(self) -> bool {
        matches!(self, Self::Processed | Self::Rejected)
    }
}

/// Per-event orchestration: decode, route, ensure conversation, persist,
/// side effects. Messages sharing a group id are handled strictly in
/// order; distinct groups run concurrently.
pub struct IngestionPipeline {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn MessageStore>,
    side_effects: SideEffectDispatcher,
    ttl_hours: i64,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<DatabaseConnection>,
        store: Arc<dyn MessageStore>,
        side_effects: SideEffectDispatcher,
        ttl_hours: i64,
    ) -> Self {
        Self {
            db,
            store,
            side_effects,
            ttl_hours,
        }
    }

    pub async fn process_batch(&self, batch: Vec<RawMessage>) -> Vec<(RawMessage, Outcome)> {
        let timer = metrics::BATCH_PROCESSING_TIME.start_timer();

        let mut groups: Vec<(Option<String>, Vec<RawMessage>)> = vec![];
        for message in batch {
            match groups.iter_mut().find(|(id, _)| *id == message.group_id) {
                Some((_, messages)) => messages.push(message),
                None => groups.push((message.group_id.clone(), vec![message])),
            }
        }

        let results = futures::future::join_all(
            groups
                .into_iter()
                .map(|(_, messages)| self.process_group(messages)),
        )
        .await;

        timer.observe_duration();
        results.into_iter().flatten().collect()
    }

    /// Once a message defers, the rest of its group defers too; acking a
    /// later message before an earlier one lands would break the ordering
    /// contract on redelivery.
    async fn process_group(&self, messages: Vec<RawMessage>) -> Vec<(RawMessage, Outcome)> {
        let mut results = vec![];
        let mut group_blocked = false;
        for message in messages {
            let outcome = if group_blocked {
                metrics::MESSAGES_DEFERRED.inc();
                Outcome::Deferred
            } else {
                self.process_one(&message).await
            };
            group_blocked |= outcome == Outcome::Deferred;
            results.push((message, outcome));
        }
        results
    }

    async fn process_one(&self, raw: &RawMessage) -> Outcome {
        match self.handle_raw(raw).await {
            Ok(()) => {
                metrics::MESSAGES_PROCESSED.inc();
                Outcome::Processed
            }
            Err(err) if err.is_deterministic() => {
                tracing::warn!(
                    message_id = %raw.message_id,
                    error = %err,
                    "deterministic failure, acking message as poison pill"
                );
                metrics::MESSAGES_REJECTED.inc();
                Outcome::Rejected
            }
            Err(err) => {
                tracing::error!(
                    message_id = %raw.message_id,
                    error = ?err,
                    "transient failure, leaving message for redelivery"
                );
                metrics::MESSAGES_DEFERRED.inc();
                Outcome::Deferred
            }
        }
    }

    async fn handle_raw(&self, raw: &RawMessage) -> Result<(), ServiceError> {
        match Event::decode(raw)? {
            Event::Message(direction, event) => self.handle_message(direction, &event).await,
            Event::ConversationWindow(event) => self.handle_window(&event).await,
        }
    }

    async fn handle_message(
        &self,
        direction: MessageDirection,
        event: &MessageEvent,
    ) -> Result<(), ServiceError> {
        let Some(conversation) = registry::ensure_active(
            &self.db,
            event.project_uuid,
            &event.contact_urn,
            event.message.contact_name.as_deref(),
            event.channel_uuid,
        )
        .await?
        else {
            // No channel, no conversation; the message is still acked.
            return Ok(());
        };

        match conversation.channel_uuid {
            Some(channel_uuid)
                if conversation.resolution == Resolution::InProgress.as_i16() =>
            {
                let scope = ConversationScope::new(
                    event.project_uuid,
                    event.contact_urn.clone(),
                    channel_uuid,
                );
                let message = HotMessage {
                    text: event.message.text.clone(),
                    source: event
                        .message
                        .source
                        .clone()
                        .unwrap_or_else(|| direction.as_str().to_string()),
                    created_at: event.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
                };
                tracing::debug!(
                    correlation_id = %event.correlation_id,
                    conversation_uuid = %conversation.uuid,
                    message_id = ?event.message.id,
                    "saving message to hot store"
                );
                self.store
                    .store(
                        &scope,
                        message,
                        Resolution::InProgress.as_i16(),
                        self.ttl_hours,
                    )
                    .await?;
            }
            _ => {
                tracing::debug!(
                    conversation_uuid = %conversation.uuid,
                    resolution = Resolution::label_of(conversation.resolution),
                    "conversation not in progress, skipping hot-store write"
                );
            }
        }

        if let Some(kind) = event.key.as_deref().and_then(SurveyKind::from_key) {
            // Survey side effects never fail the acknowledgement.
            if let Err(err) = self
                .side_effects
                .process_survey(kind, event.value.as_deref(), &conversation)
                .await
            {
                tracing::warn!(
                    correlation_id = %event.correlation_id,
                    error = ?err,
                    "error handling survey event"
                );
            }
        }

        Ok(())
    }

    async fn handle_window(&self, event: &WindowEvent) -> Result<(), ServiceError> {
        let Some(outcome) = registry::apply_window(&self.db, event).await? else {
            return Ok(());
        };

        if outcome.closed {
            match migration::migrate(&self.db, self.store.as_ref(), &outcome.conversation).await {
                Ok(_) => {
                    self.side_effects
                        .enqueue_classification(outcome.conversation.uuid);
                }
                Err(err) => {
                    tracing::error!(
                        correlation_id = %event.correlation_id,
                        conversation_uuid = %outcome.conversation.uuid,
                        error = ?err,
                        "error migrating messages for closed conversation"
                    );
                }
            }
        }

        Ok(())
    }
}
