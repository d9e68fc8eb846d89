//! Backoff for GitHub reads.
//!
//! A read that fails transiently (5xx, 429, rate-limit 403, network) is
//! retried up to three times, 2s, 4s and 8s apart. Writes go out once: a
//! label or comment request that timed out may already have been applied,
//! and repeating it could post a second comment.

use std::future::Future;
use std::time::Duration;

use crate::effects::GitHubEffect;

use super::error::{GitHubApiError, GitHubErrorKind};

/// How many times to retry, and how long to wait before the first retry.
///
/// Each later wait doubles the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RetryConfig {
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
    };

    /// Wait before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        self.initial_delay.saturating_mul(1u32 << retry.min(16))
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|r| self.delay(r))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    RetryTransient,
    Once,
}

impl RetryPolicy {
    /// Reads retry, writes run once.
    pub fn for_effect(effect: &GitHubEffect) -> Self {
        if effect.is_read() {
            RetryPolicy::RetryTransient
        } else {
            RetryPolicy::Once
        }
    }
}

/// Runs `operation`, retrying transient failures as `policy` allows.
///
/// Permanent errors (including 404) come back after the first attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, GitHubApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let retries = match policy {
        RetryPolicy::RetryTransient => config.max_retries,
        RetryPolicy::Once => 0,
    };

    let mut retry = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if err.kind == GitHubErrorKind::Permanent || retry >= retries {
            return Err(err);
        }

        let delay = config.delay(retry);
        tracing::warn!(
            retry = retry + 1,
            of = retries,
            delay_secs = delay.as_secs_f64(),
            error = %err,
            "Transient GitHub error; retrying"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
