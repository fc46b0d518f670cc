//! Confirmation gateway and chain retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::outbound::retry::RetryPolicy;
use crate::application::gateway::{GatewaySettings, PollPolicy};

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Delay before the first status query (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Factor applied to the poll interval after each query.
    #[serde(default = "default_poll_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Upper bound on total polling time (milliseconds).
    #[serde(default = "default_max_poll_duration_ms")]
    pub max_poll_duration_ms: u64,
    /// How long terminal records stay inspectable (milliseconds).
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
    /// Default wait when a caller awaits confirmation (milliseconds).
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
    /// Retries of transient chain-provider errors.
    #[serde(default)]
    pub retry: RetryConfig,
}

const fn default_poll_interval_ms() -> u64 {
    2_000
}

const fn default_poll_backoff_multiplier() -> f64 {
    1.0
}

const fn default_max_poll_interval_ms() -> u64 {
    10_000
}

const fn default_max_poll_attempts() -> u32 {
    60
}

const fn default_max_poll_duration_ms() -> u64 {
    300_000 // 5 minutes
}

const fn default_retention_ms() -> u64 {
    60_000
}

const fn default_confirmation_timeout_ms() -> u64 {
    300_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            backoff_multiplier: default_poll_backoff_multiplier(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            max_poll_duration_ms: default_max_poll_duration_ms(),
            retention_ms: default_retention_ms(),
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn settings(&self) -> GatewaySettings {
        GatewaySettings {
            poll: PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                backoff_multiplier: self.backoff_multiplier,
                max_interval: Duration::from_millis(self.max_poll_interval_ms),
                max_attempts: self.max_poll_attempts,
                max_duration: Duration::from_millis(self.max_poll_duration_ms),
            },
            retention: Duration::from_millis(self.retention_ms),
        }
    }

    #[must_use]
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}

/// `[gateway.retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

const fn default_retry_max_attempts() -> u32 {
    3
}

const fn default_retry_initial_delay_ms() -> u64 {
    200
}

const fn default_retry_max_delay_ms() -> u64 {
    5_000
}

const fn default_retry_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            initial_delay_ms: default_retry_initial_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
            backoff_multiplier: default_retry_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}
