//! Rate Limit Governor - cooperative backpressure from API quota headers
//!
//! GitHub communicates quota through `x-ratelimit-remaining` and
//! `x-ratelimit-reset` response headers. The governor inspects every response:
//! a 403 with the quota exhausted blocks the calling task until the reset
//! epoch and asks the caller to re-issue the same request. On all other
//! responses the quota is only parsed for early-warning logging; the sleep
//! stays reactive to 403.

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Remaining-quota level below which a warning is logged on every response
const LOW_WATER_MARK: u64 = 50;

/// Inspects responses for quota headers and pauses the calling task on
/// exhaustion. Holds no clock or scheduler of its own; it cooperates with
/// whichever task invoked it.
#[derive(Debug, Clone, Default)]
pub struct RateLimitGovernor;

impl RateLimitGovernor {
    pub fn new() -> Self {
        Self
    }

    /// Observe one response. Returns `true` when the caller must re-issue the
    /// same logical request (the governor has already slept through the reset
    /// window); `false` means proceed with this response as-is.
    ///
    /// Must be called on every response, not just failures: quota can be near
    /// exhaustion even on a 200.
    pub async fn observe(&self, status: StatusCode, headers: &HeaderMap) -> bool {
        let remaining = header_u64(headers, REMAINING_HEADER);

        if let Some(remaining) = remaining {
            if remaining > 0 && remaining <= LOW_WATER_MARK {
                warn!(remaining, "rate limit quota running low");
            }
        }

        if status != StatusCode::FORBIDDEN {
            return false;
        }

        match remaining {
            Some(0) => {
                if let Some(wait) = self.reset_wait(headers) {
                    warn!(
                        wait_secs = wait.as_secs(),
                        "rate limit exceeded, waiting for reset"
                    );
                    tokio::time::sleep(wait).await;
                } else {
                    debug!("rate limit exceeded but reset window already passed");
                }
                true
            }
            // 403 with quota left (or without quota headers) is not a rate
            // limit; let the caller surface it as an HTTP error.
            _ => false,
        }
    }

    /// Positive time left until the quota resets, if any
    fn reset_wait(&self, headers: &HeaderMap) -> Option<Duration> {
        let reset_epoch = header_u64(headers, RESET_HEADER)? as i64;
        let now = Utc::now().timestamp();
        let wait = reset_epoch - now;
        if wait > 0 {
            Some(Duration::from_secs(wait as u64))
        } else {
            None
        }
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}
