use std::time::Duration;

use tokio::sync::watch;
use tracing::instrument;

use crate::{
    queue::{DeleteEntry, SqsQueueClient},
    services::pipeline::IngestionPipeline,
};

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// The long-running poll loop: receive, process, ack. On shutdown the
/// in-flight batch completes before the loop exits; un-acked messages
/// redeliver after their visibility timeout.
pub struct Consumer {
    queue: SqsQueueClient,
    pipeline: IngestionPipeline,
}

impl Consumer {
    pub fn new(queue: SqsQueueClient, pipeline: IngestionPipeline) -> Self {
        Self { queue, pipeline }
    }

    #[instrument(name = "consumer", skip_all, level = "info")]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("starting to consume messages");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let batch = tokio::select! {
                _ = shutdown.changed() => break,
                received = self.queue.receive() => match received {
                    Ok(batch) => batch,
                    Err(err) => {
                        tracing::error!(error = ?err, "queue receive failed");
                        tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                        continue;
                    }
                },
            };

            if batch.is_empty() {
                continue;
            }
            tracing::debug!(batch_size = batch.len(), "received batch");

            let results = self.pipeline.process_batch(batch).await;
            let deletes: Vec<DeleteEntry> = results
                .into_iter()
                .filter(|(_, outcome)| outcome.should_delete())
                .map(|(message, _)| DeleteEntry {
                    message_id: message.message_id,
                    receipt_handle: message.receipt_handle,
                })
                .collect();
            if !deletes.is_empty() {
                self.queue.delete_batch(deletes).await;
            }
        }
        tracing::info!("consumer stopped");
    }
}
