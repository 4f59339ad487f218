use lazy_static::lazy_static;
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

lazy_static! {
    pub static ref MESSAGES_PROCESSED: IntCounter = register_int_counter!(
        "conversation_ingestion_messages_processed",
        "number of queue messages processed successfully",
    )
    .unwrap();
    pub static ref MESSAGES_REJECTED: IntCounter = register_int_counter!(
        "conversation_ingestion_messages_rejected",
        "number of queue messages acked as poison pills",
    )
    .unwrap();
    pub static ref MESSAGES_DEFERRED: IntCounter = register_int_counter!(
        "conversation_ingestion_messages_deferred",
        "number of queue messages left for redelivery",
    )
    .unwrap();
    pub static ref CONVERSATIONS_MIGRATED: IntCounter = register_int_counter!(
        "conversation_ingestion_conversations_migrated",
        "number of closed conversations migrated to the durable store",
    )
    .unwrap();
    pub static ref BATCH_PROCESSING_TIME: Histogram = register_histogram!(
        "conversation_ingestion_batch_processing_time_seconds",
        "time spent processing one polled batch in seconds",
    )
    .unwrap();
}
