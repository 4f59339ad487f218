use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use tokio_cron_scheduler::{Job, JobSchedulerError};
use tracing::instrument;

use crate::{
    clients::BillingClient,
    error::ServiceError,
    repository,
    services::{jobs::create_repeated_job, resolution_counter::ResolutionCounter},
};

/// Periodic rollup of per-channel resolution counts, posted to the billing
/// endpoint once per project per day.
pub struct BillingAggregator {
    db: Arc<DatabaseConnection>,
    client: BillingClient,
}

impl BillingAggregator {
    pub fn new(db: Arc<DatabaseConnection>, client: BillingClient) -> Self {
        Self { db, client }
    }

    /// Aggregates the target date (yesterday by default) for every project
    /// that opened conversations that day. A failing project is logged and
    /// skipped so it cannot block the rest of the rollup.
    #[instrument(name = "billing_rollup", skip(self))]
    pub async fn run_for_date(&self, target_date: Option<NaiveDate>) -> Result<(), ServiceError> {
        let date = target_date.unwrap_or_else(|| (Utc::now() - Duration::days(1)).date_naive());
        let counter = ResolutionCounter::database_backed(self.db.clone());

        let projects =
            repository::conversations::projects_with_conversations_on(self.db.as_ref(), date)
                .await?;
        tracing::info!(%date, projects = projects.len(), "aggregating conversations");

        for project_uuid in projects {
            let counts = counter.all_channels_counts(project_uuid, date).await?;
            if counts.is_empty() {
                continue;
            }
            if let Err(err) = self
                .client
                .send_conversations(project_uuid, date, &counts)
                .await
            {
                tracing::error!(
                    %project_uuid,
                    %date,
                    error = ?err,
                    "failed to send billing conversations"
                );
            }
        }

        Ok(())
    }

    pub fn daily_job(
        self: Arc<Self>,
        interval: std::time::Duration,
    ) -> Result<Job, JobSchedulerError> {
        create_repeated_job("billing rollup", interval, move || {
            let aggregator = Arc::clone(&self);
            async move { aggregator.run_for_date(None).await }
        })
    }
}
