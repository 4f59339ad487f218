use aws_sdk_sqs::types::{DeleteMessageBatchRequestEntry, MessageSystemAttributeName};

use crate::error::ServiceError;

/// SQS caps both receive and delete batches at 10 entries.
pub const MAX_BATCH_SIZE: i32 = 10;
const LONG_POLL_WAIT_SECONDS: i32 = 20;

/// A message pulled off the ingress FIFO queue, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub event_type: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub message_id: String,
    pub receipt_handle: String,
}

#[derive(Clone)]
pub struct SqsQueueClient {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueueClient {
    pub fn new(sdk_config: &aws_config::SdkConfig, queue_url: String) -> Self {
        Self {
            client: aws_sdk_sqs::Client::new(sdk_config),
            queue_url,
        }
    }

    /// Long-polls the queue for up to 20 seconds. An empty vec on timeout
    /// is normal operation, not an error.
    pub async fn receive(&self) -> Result<Vec<RawMessage>, ServiceError> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(MAX_BATCH_SIZE)
            .wait_time_seconds(LONG_POLL_WAIT_SECONDS)
            .message_attribute_names("All")
            .message_system_attribute_names(MessageSystemAttributeName::MessageGroupId)
            .send()
            .await
            .map_err(|e| ServiceError::Queue(e.into()))?;

        let messages = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let event_type = message
                    .message_attributes
                    .as_ref()
                    .and_then(|attrs| attrs.get("event_type"))
                    .and_then(|attr| attr.string_value())
                    .map(str::to_string);
                let group_id = message
                    .attributes
                    .as_ref()
                    .and_then(|attrs| attrs.get(&MessageSystemAttributeName::MessageGroupId))
                    .cloned();
                Some(RawMessage {
                    message_id: message.message_id.clone()?,
                    receipt_handle: message.receipt_handle.clone()?,
                    body: message.body.clone()?,
                    event_type,
                    group_id,
                })
            })
            .collect();

        Ok(messages)
    }

    /// Deletes acknowledged messages in batches of 10; a failed batch call
    /// degrades to per-message deletes so one bad receipt cannot block the
    /// rest. Per-message failures are logged and dropped, the visibility
    /// timeout redelivers them and idempotent processing absorbs the
    /// duplicate.
    pub async fn delete_batch(&self, entries: Vec<DeleteEntry>) {
        for chunk in entries.chunks(MAX_BATCH_SIZE as usize) {
            let batch = chunk
                .iter()
                .enumerate()
                .filter_map(|(idx, entry)| {
                    DeleteMessageBatchRequestEntry::builder()
                        .id(idx.to_string())
                        .receipt_handle(&entry.receipt_handle)
                        .build()
                        .ok()
                })
                .collect::<Vec<_>>();

            match self
                .client
                .delete_message_batch()
                .queue_url(&self.queue_url)
                .set_entries(Some(batch))
                .send()
                .await
            {
                Ok(response) => {
                    for failed in response.failed() {
                        let entry = failed
                            .id()
                            .parse::<usize>()
                            .ok()
                            .and_then(|idx| chunk.get(idx));
                        if let Some(entry) = entry {
                            self.delete_one(entry).await;
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(error = ?err, "batch delete failed, falling back to per-message deletes");
                    for entry in chunk {
                        self.delete_one(entry).await;
                    }
                }
            }
        }
    }

    async fn delete_one(&self, entry: &DeleteEntry) {
        if let Err(err) = self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&entry.receipt_handle)
            .send()
            .await
        {
            tracing::error!(
                message_id = %entry.message_id,
                error = ?err,
                "failed to delete message"
            );
        }
    }
}
