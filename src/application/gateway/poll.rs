//! Bounded status polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::port::{ChainState, ChainStatusProvider};

/// How a submitted transaction is polled.
///
/// Polling stops after `max_attempts` status queries or `max_duration`,
/// whichever comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Factor applied to the interval after every attempt; 1.0 polls at a
    /// fixed rate.
    pub backoff_multiplier: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
    pub max_duration: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_millis(10_000),
            max_attempts: 60,
            max_duration: Duration::from_millis(300_000),
        }
    }
}

impl PollPolicy {
    /// Interval to wait after `current`.
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.backoff_multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_interval)
    }
}

/// How polling ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    Confirmed { confirmations: u32 },
    Failed { reason: String },
    /// The policy bound was hit before a terminal state was observed.
    Exhausted { reason: String },
    Cancelled,
}

/// Poll `tx_hash` until a terminal state, the policy bound or cancellation.
pub(crate) async fn poll_until_terminal(
    chain: Arc<dyn ChainStatusProvider>,
    tx_hash: &str,
    policy: &PollPolicy,
    cancel: CancellationToken,
) -> PollOutcome {
    let started = Instant::now();
    let deadline = started + policy.max_duration;
    let mut interval = policy.interval;
    let mut attempts = 0u32;

    loop {
        tokio::select! {
            () = cancel.cancelled() => return PollOutcome::Cancelled,
            () = sleep(interval) => {}
        }
        if Instant::now() >= deadline {
            return PollOutcome::Exhausted {
                reason: format!(
                    "confirmation timed out after {}ms",
                    policy.max_duration.as_millis()
                ),
            };
        }

        attempts += 1;
        match chain.get_transaction_status(tx_hash).await {
            Ok(status) => {
                debug!(
                    tx_hash,
                    attempt = attempts,
                    state = ?status.state,
                    confirmations = status.confirmations,
                    "Status polled"
                );
                match status.state {
                    ChainState::Confirmed => {
                        return PollOutcome::Confirmed {
                            confirmations: status.confirmations,
                        }
                    }
                    ChainState::Failed => {
                        return PollOutcome::Failed {
                            reason: "transaction failed on chain".to_string(),
                        }
                    }
                    ChainState::Timeout => {
                        return PollOutcome::Failed {
                            reason: "transaction timed out on chain".to_string(),
                        }
                    }
                    ChainState::Pending | ChainState::Confirming => {}
                }
            }
            Err(e) if e.is_transient() => {
                warn!(tx_hash, attempt = attempts, error = %e, "Transient status error");
            }
            Err(e) => {
                return PollOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }

        if attempts >= policy.max_attempts {
            return PollOutcome::Exhausted {
                reason: format!("no terminal status after {attempts} attempts"),
            };
        }
        interval = policy.next_interval(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped() {
        let policy = PollPolicy {
            interval: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_millis(300),
            ..PollPolicy::default()
        };
        let second = policy.next_interval(policy.interval);
        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(policy.next_interval(second), Duration::from_millis(300));
    }

    #[test]
    fn unit_multiplier_keeps_interval_fixed() {
        let policy = PollPolicy::default();
        assert_eq!(policy.next_interval(policy.interval), policy.interval);
    }
}
