//! HTTP-backed fetch operation.

use std::time::Duration;

use async_trait::async_trait;

use crate::aggregation::{FetchError, FetchOperation, FetchResult};
use crate::config::DownstreamConfig;
use crate::resilience::RetryPolicy;

/// Placeholder in URL templates replaced by the subject.
pub const SUBJECT_PLACEHOLDER: &str = "{id}";

/// Build the shared downstream client.
///
/// One client is created per configuration and handed to every fetcher,
/// so connection pools are shared without any global state.
pub fn build_client(config: &DownstreamConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(concat!("concurrent-api-gateway/", env!("CARGO_PKG_VERSION")));
    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// GETs a JSON document from a URL template.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    url_template: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(url_template: impl Into<String>, client: reqwest::Client, retry: RetryPolicy) -> Self {
        Self {
            url_template: url_template.into(),
            client,
            retry,
        }
    }

    /// Resolve the template for `subject`, percent-encoding the subject.
    pub fn url_for(&self, subject: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(subject.as_bytes()).collect();
        self.url_template.replace(SUBJECT_PLACEHOLDER, &encoded)
    }

    async fn attempt(&self, url: &str) -> FetchResult {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let payload = response.json::<serde_json::Value>().await?;
        Ok(payload)
    }
}

#[async_trait]
impl FetchOperation for HttpFetcher {
    async fn fetch(&self, subject: &str) -> FetchResult {
        let url = self.url_for(subject);
        let mut retry = 0;

        loop {
            match self.attempt(&url).await {
                Ok(payload) => return Ok(payload),
                Err(err) => {
                    retry += 1;
                    match self.retry.next_delay(retry, &err) {
                        Some(delay) => {
                            tracing::debug!(url = %url, retry, delay = ?delay, error = %err, "Retrying downstream request");
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(err),
                    }
                }
            }
        }
    }
}
