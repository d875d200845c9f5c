//! HTTP health checks

use std::time::Duration;

use controller::HealthCheck;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::HarnessResult;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Passes when `GET url` answers with the expected status
///
/// Connection errors, timeouts and unexpected statuses all count as "not
/// healthy yet".
#[derive(Clone, Debug)]
pub struct UrlHealthCheck {
    url: String,
    expected_status: StatusCode,
    client: reqwest::Client,
}

impl UrlHealthCheck {
    pub fn new(url: impl Into<String>) -> HarnessResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            expected_status: StatusCode::OK,
            client,
        })
    }

    pub fn with_expected_status(mut self, status: StatusCode) -> Self {
        self.expected_status = status;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl HealthCheck for UrlHealthCheck {
    async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                if status != self.expected_status {
                    debug!("🩺 {} answered {} (expected {})", self.url, status, self.expected_status);
                }
                status == self.expected_status
            }
            Err(e) => {
                debug!("🩺 {} unreachable: {}", self.url, e);
                false
            }
        }
    }
}
