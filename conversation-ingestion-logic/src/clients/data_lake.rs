use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::{error::ServiceError, settings::DataLakeSettings};

pub const DATA_LAKE_EVENT_NAME: &str = "weni_nexus_data";

/// Event destined for the data-lake transport. All string fields must be
/// non-empty after trimming and `value` must be present before the event
/// may be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataLakeEvent {
    pub event_name: String,
    pub date: String,
    pub project: String,
    pub contact_urn: String,
    pub key: String,
    pub value_type: String,
    pub value: Option<String>,
    pub metadata: Value,
}

impl DataLakeEvent {
    /// Checks every field and reports all violations at once.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let mut errors = vec![];

        let string_fields = [
            ("project", &self.project),
            ("contact_urn", &self.contact_urn),
            ("key", &self.key),
            ("date", &self.date),
            ("value_type", &self.value_type),
        ];
        for (name, value) in string_fields {
            if value.trim().is_empty() {
                errors.push(format!("{name} cannot be empty"));
            }
        }

        if self.value.is_none() {
            errors.push("value cannot be None".to_string());
        }

        if self.event_name != DATA_LAKE_EVENT_NAME {
            errors.push(format!("event_name must be \"{DATA_LAKE_EVENT_NAME}\""));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(format!(
                "event validation failed: {}",
                errors.join(", ")
            )))
        }
    }

    /// The wire shape, with string fields trimmed.
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "event_name": self.event_name,
            "date": self.date,
            "project": self.project.trim(),
            "contact_urn": self.contact_urn.trim(),
            "key": self.key.trim(),
            "value_type": self.value_type,
            "value": self.value,
            "metadata": self.metadata,
        })
    }
}

#[async_trait]
pub trait DataLakeSink: Send + Sync {
    async fn send(&self, event: &DataLakeEvent) -> Result<(), ServiceError>;
}

/// POSTs validated events to the configured transport endpoint.
pub struct HttpDataLakeSink {
    http: ClientWithMiddleware,
    url: Url,
}

impl HttpDataLakeSink {
    pub fn new(settings: &DataLakeSettings) -> Self {
        Self {
            http: super::http_client(),
            url: settings.base_url.clone(),
        }
    }
}

#[async_trait]
impl DataLakeSink for HttpDataLakeSink {
    async fn send(&self, event: &DataLakeEvent) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(&event.to_payload())
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApi(e.into()))?;
        response
            .error_for_status()
            .map_err(|e| ServiceError::ExternalApi(e.into()))?;
        tracing::info!(key = %event.key, "data lake event sent");
        Ok(())
    }
}

/// Stand-in sink for deployments without a data-lake endpoint; events are
/// logged and dropped.
pub struct LoggingDataLakeSink;

#[async_trait]
impl DataLakeSink for LoggingDataLakeSink {
    async fn send(&self, event: &DataLakeEvent) -> Result<(), ServiceError> {
        tracing::info!(
            key = %event.key,
            payload = %event.to_payload(),
            "data lake transport not configured, dropping event"
        );
        Ok(())
    }
}
