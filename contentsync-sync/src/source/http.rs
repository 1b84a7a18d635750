//! Resilient HTTP client for remote sources.
//!
//! Wraps a `reqwest::Client` with a per-request timeout and a bounded number
//! of retries with exponential backoff. Connection failures, timeouts, and
//! the statuses in the force list are retried; everything else is returned
//! to the caller as-is.

use crate::error::SourceResult;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Maximum number of retries after the first attempt.
    pub retries: u32,
    /// Base backoff in milliseconds; attempt `n` waits `backoff * 2^n`.
    pub backoff_factor_ms: u64,
    /// Upper bound for a single backoff, in milliseconds.
    pub max_backoff_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Response statuses that trigger a retry.
    pub status_forcelist: Vec<u16>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retries: 7,
            backoff_factor_ms: 300,
            max_backoff_ms: 120_000,
            timeout_secs: 30,
            status_forcelist: vec![500, 501, 502, 503, 504],
            user_agent: format!("contentsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Retry decisions and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
    pub status_forcelist: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.retries,
            backoff_factor: Duration::from_millis(config.backoff_factor_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            status_forcelist: config.status_forcelist.clone(),
        }
    }

    /// Backoff before retry number `attempt` (0-based), capped at `max_backoff`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.backoff_factor
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Whether a response with `status` should be retried.
    #[must_use]
    pub fn retries_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// Whether a transport error should be retried.
    #[must_use]
    pub fn retries_error(&self, error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request()
    }
}

/// An HTTP client with bounded retries.
///
/// Constructed once per run and passed to the source provider.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: Client,
    policy: RetryPolicy,
}

impl ResilientClient {
    /// Builds a client from configuration.
    pub fn new(config: &HttpConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            policy: RetryPolicy::from_config(config),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issues a GET, retrying transient failures.
    ///
    /// When retries run out on a force-listed status, the last response is
    /// returned so the caller can report its status.
    pub async fn get(&self, url: &str) -> SourceResult<Response> {
        let mut attempt: u32 = 0;
        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !self.policy.retries_status(status) {
                        return Ok(response);
                    }
                    if attempt >= self.policy.max_retries {
                        warn!(url, status, attempts = attempt + 1, "Max retries exceeded");
                        return Ok(response);
                    }
                    let delay = self.policy.delay_for(attempt);
                    debug!(url, status, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Retrying after error status");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if !self.policy.retries_error(&error) {
                        return Err(error.into());
                    }
                    if attempt >= self.policy.max_retries {
                        warn!(url, attempts = attempt + 1, error = %error, "Max retries exceeded");
                        return Err(error.into());
                    }
                    let delay = self.policy.delay_for(attempt);
                    debug!(url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %error, "Retrying after transient error");
                    tokio::time::sleep(delay).await;
                }
            }
            attempt += 1;
        }
    }
}
