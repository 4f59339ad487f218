use std::time::Duration;

use aws_config::{sts::AssumeRoleProvider, BehaviorVersion, Region, SdkConfig};

const SESSION_NAME: &str = "ConversationIngestionSession";
const SESSION_LENGTH: Duration = Duration::from_secs(3600);

/// Builds the shared SDK config for the SQS, DynamoDB and Lambda clients.
///
/// With `assume_role_arn` set, credentials come from an auto-refreshing
/// STS assume-role provider so long-running consumers survive credential
/// expiry; otherwise the default provider chain applies (IRSA compatible).
pub async fn sdk_config(region: String, assume_role_arn: Option<&str>) -> SdkConfig {
    let region = Region::new(region);
    let loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());

    match assume_role_arn {
        Some(role_arn) => {
            tracing::info!(role_arn, region = %region, "assuming role for aws clients");
            let base = aws_config::defaults(BehaviorVersion::latest())
                .region(region.clone())
                .load()
                .await;
            let provider = AssumeRoleProvider::builder(role_arn)
                .session_name(SESSION_NAME)
                .session_length(SESSION_LENGTH)
                .region(region)
                .configure(&base)
                .build()
                .await;
            loader.credentials_provider(provider).load().await
        }
        None => loader.load().await,
    }
}
