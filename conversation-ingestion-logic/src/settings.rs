use std::time;

use anyhow::Context;
use serde::Deserialize;
use serde_with::serde_as;
use url::Url;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MESSAGE_TABLE: &str = "NexusMessages";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IngestionSettings {
    pub queue: QueueSettings,
    #[serde(default)]
    pub hot_store: HotStoreSettings,
    #[serde(default)]
    pub billing: Option<BillingSettings>,
    #[serde(default)]
    pub data_lake: Option<DataLakeSettings>,
    #[serde(default)]
    pub classification: Option<ClassificationSettings>,
    #[serde(default)]
    pub agents: AgentSettings,
    #[serde(default)]
    pub assume_role_arn: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QueueSettings {
    pub url: String,
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HotStoreSettings {
    #[serde(default = "default_message_table")]
    pub table: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BillingSettings {
    pub base_url: Url,
    pub token: String,
    #[serde(default = "default_rollup_interval")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub rollup_interval: time::Duration,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DataLakeSettings {
    pub base_url: Url,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClassificationSettings {
    pub lambda_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AgentSettings {
    #[serde(default)]
    pub csat_uuid: String,
    #[serde(default)]
    pub nps_uuid: String,
}

impl IngestionSettings {
    /// Assembles settings from the flat environment keys the deployment
    /// uses. The queue URL is the one hard requirement; everything else
    /// has a default or disables its subsystem when absent.
    pub fn from_env() -> anyhow::Result<Self> {
        let queue_url = env_opt("SQS_CONVERSATION_QUEUE_URL")
            .context("SQS_CONVERSATION_QUEUE_URL must be set")?;

        let billing = match env_opt("BILLING_BASE_URL") {
            Some(base_url) => Some(BillingSettings {
                base_url: base_url.parse().context("invalid BILLING_BASE_URL")?,
                token: env_opt("BILLING_TOKEN").unwrap_or_default(),
                rollup_interval: default_rollup_interval(),
            }),
            None => None,
        };

        let data_lake = match env_opt("DATA_LAKE_BASE_URL") {
            Some(base_url) => Some(DataLakeSettings {
                base_url: base_url.parse().context("invalid DATA_LAKE_BASE_URL")?,
            }),
            None => None,
        };

        Ok(Self {
            queue: QueueSettings {
                url: queue_url,
                region: env_or("SQS_CONVERSATION_REGION", DEFAULT_REGION),
            },
            hot_store: HotStoreSettings {
                table: env_or("DYNAMODB_MESSAGE_TABLE", DEFAULT_MESSAGE_TABLE),
                region: env_or("DYNAMODB_REGION", DEFAULT_REGION),
                ttl_hours: default_ttl_hours(),
            },
            billing,
            data_lake,
            classification: env_opt("CLASSIFICATION_LAMBDA_NAME")
                .map(|lambda_name| ClassificationSettings { lambda_name }),
            agents: AgentSettings {
                csat_uuid: env_or("AGENT_UUID_CSAT", ""),
                nps_uuid: env_or("AGENT_UUID_NPS", ""),
            },
            assume_role_arn: env_opt("AWS_ASSUME_ROLE_ARN"),
        })
    }
}

impl Default for HotStoreSettings {
    fn default() -> Self {
        Self {
            table: default_message_table(),
            region: default_region(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_message_table() -> String {
    DEFAULT_MESSAGE_TABLE.to_string()
}

fn default_ttl_hours() -> i64 {
    48
}

fn default_rollup_interval() -> time::Duration {
    time::Duration::from_secs(24 * 60 * 60)
}
