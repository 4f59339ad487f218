use std::collections::HashMap;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::Utc;
use uuid::Uuid;

use super::{sortable_timestamp, HotMessage, MessagePage, MessageStore};
use crate::{
    error::ServiceError,
    settings::HotStoreSettings,
    types::{ArchivedMessage, ConversationScope},
};

const PARTITION_KEY: &str = "conversation_key";
const SORT_KEY: &str = "message_timestamp";
/// DynamoDB BatchWriteItem caps at 25 requests.
const DELETE_BATCH_SIZE: usize = 25;

#[derive(Clone)]
pub struct DynamoMessageStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoMessageStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, settings: &HotStoreSettings) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(sdk_config),
            table: settings.table.clone(),
        }
    }

    fn decode_cursor(cursor: &str) -> Option<HashMap<String, AttributeValue>> {
        let decoded = BASE64_STANDARD.decode(cursor).ok()?;
        let keys: HashMap<String, String> = serde_json::from_slice(&decoded).ok()?;
        Some(
            keys.into_iter()
                .map(|(k, v)| (k, AttributeValue::S(v)))
                .collect(),
        )
    }

    fn encode_cursor(last_evaluated_key: &HashMap<String, AttributeValue>) -> Option<String> {
        let keys: HashMap<&str, &String> = last_evaluated_key
            .iter()
            .filter_map(|(k, v)| Some((k.as_str(), v.as_s().ok()?)))
            .collect();
        let json = serde_json::to_vec(&keys).ok()?;
        Some(BASE64_STANDARD.encode(json))
    }

    fn format_message(item: &HashMap<String, AttributeValue>) -> ArchivedMessage {
        let string_of = |field: &str| {
            item.get(field)
                .and_then(|v| v.as_s().ok())
                .cloned()
                .unwrap_or_default()
        };
        ArchivedMessage {
            text: string_of("message_text"),
            source: string_of("source_type"),
            created_at: string_of("created_at"),
        }
    }

    async fn query_page(
        &self,
        partition_key: &str,
        limit: Option<i32>,
        exclusive_start_key: Option<HashMap<String, AttributeValue>>,
        projection: Option<&str>,
    ) -> Result<
        (
            Vec<HashMap<String, AttributeValue>>,
            Option<HashMap<String, AttributeValue>>,
        ),
        ServiceError,
    > {
        let mut query = self
            .client
            .query()
            .table_name(&self.table)
            .key_condition_expression("conversation_key = :conv_key")
            .expression_attribute_values(":conv_key", AttributeValue::S(partition_key.to_string()))
            .scan_index_forward(false)
            .set_exclusive_start_key(exclusive_start_key);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(projection) = projection {
            query = query.projection_expression(projection);
        }

        let response = query
            .send()
            .await
            .map_err(|e| ServiceError::HotStore(e.into()))?;

        Ok((
            response.items.unwrap_or_default(),
            response.last_evaluated_key,
        ))
    }
}

#[async_trait]
impl MessageStore for DynamoMessageStore {
    async fn store(
        &self,
        scope: &ConversationScope,
        message: HotMessage,
        resolution_status: i16,
        ttl_hours: i64,
    ) -> Result<(), ServiceError> {
        let partition_key = scope.partition_key();
        let message_id = Uuid::new_v4().to_string();
        let sortable = sortable_timestamp(&message.created_at);
        let expires_on = Utc::now().timestamp() + ttl_hours * 3600;

        let s = AttributeValue::S;
        let item = HashMap::from([
            (PARTITION_KEY.to_string(), s(partition_key.clone())),
            (SORT_KEY.to_string(), s(format!("{sortable}#{message_id}"))),
            ("conversation_id".to_string(), s(partition_key)),
            (
                "project_uuid".to_string(),
                s(scope.project_uuid.to_string()),
            ),
            ("contact_urn".to_string(), s(scope.contact_urn.clone())),
            (
                "channel_uuid".to_string(),
                s(scope.channel_uuid.to_string()),
            ),
            ("message_id".to_string(), s(message_id)),
            ("message_text".to_string(), s(message.text)),
            ("source_type".to_string(), s(message.source)),
            ("created_at".to_string(), s(sortable)),
            (
                "resolution_status".to_string(),
                AttributeValue::N(resolution_status.to_string()),
            ),
            (
                "ExpiresOn".to_string(),
                AttributeValue::N(expires_on.to_string()),
            ),
        ]);

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| ServiceError::HotStore(e.into()))?;

        Ok(())
    }

    async fn get_messages(
        &self,
        scope: &ConversationScope,
        limit: i32,
        cursor: Option<String>,
    ) -> Result<MessagePage, ServiceError> {
        let exclusive_start_key = cursor.as_deref().and_then(|cursor| {
            let key = Self::decode_cursor(cursor);
            if key.is_none() {
                tracing::warn!(cursor, "invalid pagination cursor, ignoring");
            }
            key
        });

        let (items, last_evaluated_key) = self
            .query_page(
                &scope.partition_key(),
                Some(limit),
                exclusive_start_key,
                None,
            )
            .await?;

        Ok(MessagePage {
            items: items.iter().map(Self::format_message).collect(),
            next_cursor: last_evaluated_key
                .as_ref()
                .and_then(Self::encode_cursor),
        })
    }

    async fn get_all_messages(
        &self,
        scope: &ConversationScope,
    ) -> Result<Vec<ArchivedMessage>, ServiceError> {
        let partition_key = scope.partition_key();
        let mut messages = vec![];
        let mut exclusive_start_key = None;

        loop {
            let (items, last_evaluated_key) = self
                .query_page(&partition_key, None, exclusive_start_key, None)
                .await?;
            messages.extend(items.iter().map(Self::format_message));
            if last_evaluated_key.is_none() {
                break;
            }
            exclusive_start_key = last_evaluated_key;
        }

        Ok(messages)
    }

    async fn delete_all(&self, scope: &ConversationScope) -> Result<usize, ServiceError> {
        let partition_key = scope.partition_key();
        let mut deleted = 0;
        let mut exclusive_start_key = None;

        loop {
            let (items, last_evaluated_key) = self
                .query_page(
                    &partition_key,
                    None,
                    exclusive_start_key,
                    Some("conversation_key, message_timestamp"),
                )
                .await?;

            for chunk in items.chunks(DELETE_BATCH_SIZE) {
                let requests = chunk
                    .iter()
                    .map(|item| {
                        let key = [PARTITION_KEY, SORT_KEY]
                            .iter()
                            .filter_map(|field| {
                                Some((field.to_string(), item.get(*field)?.clone()))
                            })
                            .collect::<HashMap<_, _>>();
                        let delete = DeleteRequest::builder()
                            .set_key(Some(key))
                            .build()
                            .context("building delete request")?;
                        Ok(WriteRequest::builder().delete_request(delete).build())
                    })
                    .collect::<Result<Vec<_>, anyhow::Error>>()
                    .map_err(ServiceError::HotStore)?;

                self.client
                    .batch_write_item()
                    .request_items(&self.table, requests)
                    .send()
                    .await
                    .map_err(|e| ServiceError::HotStore(anyhow!(e)))?;
                deleted += chunk.len();
            }

            if last_evaluated_key.is_none() {
                break;
            }
            exclusive_start_key = last_evaluated_key;
        }

        Ok(deleted)
    }
}
