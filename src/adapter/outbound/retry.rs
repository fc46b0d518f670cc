//! Retrying wrapper for [`ChainStatusProvider`].
//!
//! Retries only errors the provider marks as transient, waiting with
//! exponential backoff plus jitter between attempts. Rejections pass
//! through untouched on the first attempt.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::port::{ChainStatus, ChainStatusProvider, SubmissionReceipt, TransactionDescriptor};

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(5_000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), without jitter.
    #[must_use]
    pub fn base_delay(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        let ms = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(ms).min(self.max_delay)
    }

    /// Base delay plus up to 20% random jitter.
    fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        let jitter_range_ms = (base.as_millis() as u64) / 5;
        if jitter_range_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_range_ms))
    }
}

/// Wraps a chain provider and retries transient failures.
pub struct RetryingChainProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: ChainStatusProvider> RetryingChainProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Chain call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient chain error, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<P: ChainStatusProvider> ChainStatusProvider for RetryingChainProvider<P> {
    async fn submit_transaction(
        &self,
        descriptor: &TransactionDescriptor,
    ) -> Result<SubmissionReceipt, ProviderError> {
        self.run("submit_transaction", move || {
            self.inner.submit_transaction(descriptor)
        })
        .await
    }

    async fn get_transaction_status(&self, tx_hash: &str) -> Result<ChainStatus, ProviderError> {
        self.run("get_transaction_status", move || {
            self.inner.get_transaction_status(tx_hash)
        })
        .await
    }
}
