//! Retry with exponential backoff on rate limits
//!
//! Delay before retry `n` (0-based) is `initial_delay * backoff_multiplier^n`,
//! capped at `max_delay`. There is no jitter.

use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    5 * 60 * 1_000
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(millis as u64)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay(),
            initial_interval: self.initial_delay(),
            randomization_factor: 0.0,
            multiplier: self.backoff_multiplier,
            max_interval: self.max_delay(),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

/// Run `operation`, retrying transient failures per `policy`.
///
/// `on_retry(attempt, delay, &error)` is called before each wait. Non-transient
/// errors are returned immediately; exhausting the retries returns
/// [`Error::RateLimitExhausted`] wrapping the last error.
pub async fn with_retry<T, F, Fut, R>(policy: &RetryPolicy, mut operation: F, mut on_retry: R) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(u32, Duration, &Error),
{
    let failures = AtomicU32::new(0);
    let max_retries = policy.max_retries;

    backoff::future::retry_notify(
        policy.backoff(),
        || {
            let fut = operation();
            let failures = &failures;
            async move {
                fut.await.map_err(|e| {
                    if !e.is_transient() {
                        return backoff::Error::permanent(e);
                    }
                    let failed = failures.fetch_add(1, Ordering::SeqCst);
                    if failed >= max_retries {
                        return backoff::Error::permanent(Error::RateLimitExhausted {
                            attempts: failed + 1,
                            source: Box::new(e),
                        });
                    }
                    backoff::Error::transient(e)
                })
            }
        },
        |e: Error, delay: Duration| {
            let attempt = failures.load(Ordering::SeqCst).saturating_sub(1);
            on_retry(attempt, delay, &e);
        },
    )
    .await
}
