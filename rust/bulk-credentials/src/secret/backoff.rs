use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::SecretError;

/// Bounded exponential backoff for secret retrieval.
///
/// The delay before retry `n` (counting from zero) is `delay * 2^n`, capped
/// at `max_delay`. Only transient failures are retried, and at most
/// `max_retries` times after the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub delay: Duration,
    /// Longest delay between two attempts.
    pub max_delay: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(16),
            max_retries: 5,
        }
    }
}

impl Backoff {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_retries: 0,
        }
    }

    /// Delay to wait before the given retry.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn retry<F, Fut, T>(&self, mut op: F) -> Result<T, SecretError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SecretError>>,
    {
        let mut retry = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && retry < self.max_retries => {
                    let delay = self.delay_for(retry);
                    warn!(
                        retry = retry + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "Secret fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
