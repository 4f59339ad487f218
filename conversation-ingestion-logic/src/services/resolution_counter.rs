use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{error::ServiceError, repository, types::ChannelResolutionCount};

/// Pluggable source of per-channel resolution counts: either a grouped
/// scan over the conversations table or a pre-computed map, substitutable
/// without changing call sites.
pub enum ResolutionCounter {
    DatabaseBacked {
        db: Arc<DatabaseConnection>,
    },
    PreComputed {
        counts: BTreeMap<Uuid, ChannelResolutionCount>,
    },
}

impl ResolutionCounter {
    pub fn database_backed(db: Arc<DatabaseConnection>) -> Self {
        Self::DatabaseBacked { db }
    }

    pub fn pre_computed(counts: impl IntoIterator<Item = ChannelResolutionCount>) -> Self {
        Self::PreComputed {
            counts: counts
                .into_iter()
                .map(|count| (count.channel_uuid, count))
                .collect(),
        }
    }

    pub async fn channel_counts(
        &self,
        project_uuid: Uuid,
        channel_uuid: Uuid,
        date: NaiveDate,
    ) -> Result<ChannelResolutionCount, ServiceError> {
        match self {
            Self::DatabaseBacked { db } => Ok(repository::conversations::
                count_resolutions_for_channel(db.as_ref(), project_uuid, channel_uuid, date)
                .await?),
            Self::PreComputed { counts } => Ok(counts
                .get(&channel_uuid)
                .cloned()
                .unwrap_or_else(|| ChannelResolutionCount::empty(channel_uuid))),
        }
    }

    pub async fn all_channels_counts(
        &self,
        project_uuid: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ChannelResolutionCount>, ServiceError> {
        match self {
            Self::DatabaseBacked { db } => Ok(repository::conversations::
                count_resolutions_by_channel(db.as_ref(), project_uuid, date)
                .await?),
            Self::PreComputed { counts } => Ok(counts.values().cloned().collect()),
        }
    }
}
