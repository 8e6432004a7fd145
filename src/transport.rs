//! Transport Layer - HTTP client with bounded retry for transient failures
//!
//! One `reqwest::Client` is built per harvest session and shared across all
//! workers, so connections are pooled and reused. GET requests are retried
//! with exponential backoff on transient server statuses and on
//! connection-level errors; all other statuses are handed back to the caller
//! untouched (the Rate Limit Governor owns the 403 path).

use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

use crate::error::HarvestError;

/// Total attempts per logical request, including the first one
const MAX_ATTEMPTS: u32 = 5;

/// Seed for exponential backoff between retries
const BACKOFF_FACTOR: Duration = Duration::from_secs(1);

/// Statuses retried automatically for idempotent requests
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Pre-configured HTTP transport shared by every worker
#[derive(Clone)]
pub struct Transport {
    client: Client,
}

impl Transport {
    /// Build the shared client. Connection reuse across calls is required for
    /// throughput, so this is constructed once and cloned cheaply.
    pub fn new() -> Result<Self, HarvestError> {
        let client = Client::builder()
            .user_agent(concat!("reposcribe/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(20)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HarvestError::transport(None, 0, e.to_string()))?;

        Ok(Self { client })
    }

    /// Issue a GET with bounded retry on transient failures.
    ///
    /// Retryable statuses (429, 500, 502, 503, 504) and connection errors
    /// consume retry budget; every other response, success or not, is
    /// returned to the caller on the attempt that produced it.
    pub async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        query: &[(&str, String)],
    ) -> Result<Response, HarvestError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let result = self
                .client
                .get(url)
                .headers(headers.clone())
                .query(query)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable(status) {
                        return Ok(response);
                    }
                    if attempt >= MAX_ATTEMPTS {
                        return Err(HarvestError::transport(
                            Some(status.as_u16()),
                            attempt,
                            format!("GET {} kept returning {}", url, status),
                        ));
                    }
                    let delay = backoff_delay(attempt);
                    warn!(
                        url,
                        status = status.as_u16(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient status, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(HarvestError::transport(
                            e.status().map(|s| s.as_u16()),
                            attempt,
                            e.to_string(),
                        ));
                    }
                    let delay = backoff_delay(attempt);
                    warn!(
                        url,
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "request error, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Backoff before retry number `attempt + 1`: 1s, 2s, 4s, 8s
fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_FACTOR * 2u32.saturating_pow(attempt.saturating_sub(1))
}

fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}
