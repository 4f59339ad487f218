use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

pub mod billing;
pub mod data_lake;

pub use billing::BillingClient;
pub use data_lake::{DataLakeEvent, DataLakeSink, HttpDataLakeSink, LoggingDataLakeSink};

const MAX_RETRIES: u32 = 3;

/// Shared outbound HTTP client: transient failures retry with exponential
/// backoff up to three attempts.
pub(crate) fn http_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
    ClientBuilder::new(reqwest::Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}
