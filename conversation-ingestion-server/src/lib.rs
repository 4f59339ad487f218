mod settings;

pub use settings::Settings;

use std::{sync::Arc, time::Duration};

use blockscout_service_launcher::database;
use conversation_ingestion_logic::{
    aws,
    clients::{BillingClient, DataLakeSink, HttpDataLakeSink, LoggingDataLakeSink},
    hot_store::{DynamoMessageStore, MessageStore},
    queue::SqsQueueClient,
    services::{
        billing::BillingAggregator,
        classification::{self, ClassificationWorker, Classifier, LambdaClassifier},
        consumer::Consumer,
        pipeline::IngestionPipeline,
        side_effects::SideEffectDispatcher,
    },
    settings::IngestionSettings,
};
use migration::Migrator;
use tokio::sync::watch;
use tokio_cron_scheduler::JobScheduler;

const GRACEFUL_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

pub async fn run(settings: Settings, ingestion: IngestionSettings) -> Result<(), anyhow::Error> {
    let db = Arc::new(database::initialize_postgres::<Migrator>(&settings.database).await?);

    let queue_config = aws::sdk_config(
        ingestion.queue.region.clone(),
        ingestion.assume_role_arn.as_deref(),
    )
    .await;
    let dynamo_config = if ingestion.hot_store.region == ingestion.queue.region {
        queue_config.clone()
    } else {
        aws::sdk_config(
            ingestion.hot_store.region.clone(),
            ingestion.assume_role_arn.as_deref(),
        )
        .await
    };

    let store: Arc<dyn MessageStore> =
        Arc::new(DynamoMessageStore::new(&dynamo_config, &ingestion.hot_store));
    let data_lake: Arc<dyn DataLakeSink> = match &ingestion.data_lake {
        Some(data_lake_settings) => Arc::new(HttpDataLakeSink::new(data_lake_settings)),
        None => Arc::new(LoggingDataLakeSink),
    };

    let (classification_tx, mut classification_rx) = classification::channel();
    let worker_handle = match &ingestion.classification {
        Some(classification_settings) => {
            let classifier: Arc<dyn Classifier> =
                Arc::new(LambdaClassifier::new(&queue_config, classification_settings));
            let worker =
                ClassificationWorker::new(db.clone(), store.clone(), classifier, classification_rx);
            tokio::spawn(worker.run())
        }
        None => tokio::spawn(async move {
            while let Some(conversation_uuid) = classification_rx.recv().await {
                tracing::warn!(
                    %conversation_uuid,
                    "classification lambda not configured, dropping job"
                );
            }
        }),
    };

    let mut scheduler = None;
    if let Some(billing_settings) = &ingestion.billing {
        let aggregator = Arc::new(BillingAggregator::new(
            db.clone(),
            BillingClient::new(billing_settings),
        ));
        let job_scheduler = JobScheduler::new().await?;
        job_scheduler
            .add(aggregator.daily_job(billing_settings.rollup_interval)?)
            .await?;
        job_scheduler.start().await?;
        scheduler = Some(job_scheduler);
    }

    let side_effects = SideEffectDispatcher::new(
        db.clone(),
        store.clone(),
        data_lake,
        classification_tx,
        ingestion.agents.clone(),
    );
    let pipeline = IngestionPipeline::new(
        db.clone(),
        store,
        side_effects,
        ingestion.hot_store.ttl_hours,
    );
    let queue = SqsQueueClient::new(&queue_config, ingestion.queue.url.clone());
    let consumer = Consumer::new(queue, pipeline);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, finishing in-flight batch");
        let _ = shutdown_tx.send(true);
    });

    consumer.run(shutdown_rx).await;

    // Dropping the consumer closes the classification channel; the worker
    // gets a bounded window to drain queued jobs.
    drop(consumer);
    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }
    if tokio::time::timeout(GRACEFUL_SHUTDOWN_DEADLINE, worker_handle)
        .await
        .is_err()
    {
        tracing::warn!("classification worker did not drain in time, exiting anyway");
    }

    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
