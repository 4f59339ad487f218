use chrono::NaiveDate;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::{
    error::ServiceError, settings::BillingSettings, types::ChannelResolutionCount,
};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ResolutionCountBody {
    resolved: u64,
    unresolved: u64,
    has_chats_rooms: u64,
    unclassified: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ChannelConversationsBody {
    channel_uuid: Uuid,
    date: NaiveDate,
    resolution_count: ResolutionCountBody,
}

/// Client for the downstream billing endpoint; one POST per (project, day)
/// with an array element per channel.
pub struct BillingClient {
    http: ClientWithMiddleware,
    base_url: Url,
    token: String,
}

impl BillingClient {
    pub fn new(settings: &BillingSettings) -> Self {
        Self {
            http: super::http_client(),
            base_url: settings.base_url.clone(),
            token: settings.token.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn send_conversations(
        &self,
        project_uuid: Uuid,
        date: NaiveDate,
        counts: &[ChannelResolutionCount],
    ) -> Result<(), ServiceError> {
        let url = format!(
            "{}/{project_uuid}/conversation",
            self.base_url.as_str().trim_end_matches('/')
        );
        let payload: Vec<ChannelConversationsBody> = counts
            .iter()
            .map(|count| ChannelConversationsBody {
                channel_uuid: count.channel_uuid,
                date,
                resolution_count: ResolutionCountBody {
                    resolved: count.resolved,
                    unresolved: count.unresolved,
                    has_chats_rooms: count.has_chats_rooms,
                    unclassified: count.unclassified,
                },
            })
            .collect();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApi(e.into()))?;
        response
            .error_for_status()
            .map_err(|e| ServiceError::ExternalApi(e.into()))?;

        tracing::info!(
            %project_uuid,
            %date,
            channels = counts.len(),
            "billing conversations sent"
        );
        Ok(())
    }
}
