//! Balance ledger configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::ledger::LedgerSettings;
use crate::domain::{Usd, DEFAULT_MAX_AMOUNT};

/// `[ledger]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Transactions kept per user, newest first.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Age after which a held logical lock is reclaimed (milliseconds).
    #[serde(default = "default_lock_stale_after_ms")]
    pub lock_stale_after_ms: u64,
    /// How long an acquirer waits for a held lock (milliseconds).
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,
    /// Largest amount a single transaction may carry (USD).
    #[serde(default = "default_max_amount")]
    pub max_amount: Usd,
    /// Settled transaction ids remembered per user for duplicate detection.
    /// Never fewer than `history_cap`.
    #[serde(default = "default_settled_cap")]
    pub settled_cap: usize,
}

const fn default_history_cap() -> usize {
    100
}

const fn default_lock_stale_after_ms() -> u64 {
    30_000
}

const fn default_lock_wait_ms() -> u64 {
    5_000
}

const fn default_settled_cap() -> usize {
    1000
}

const fn default_max_amount() -> Usd {
    DEFAULT_MAX_AMOUNT
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            lock_stale_after_ms: default_lock_stale_after_ms(),
            lock_wait_ms: default_lock_wait_ms(),
            max_amount: default_max_amount(),
            settled_cap: default_settled_cap(),
        }
    }
}

impl LedgerConfig {
    /// Ledger tunables. Settled ids are retained as long as the gateway keeps
    /// terminal entries, so `settled_retention` comes from `[gateway]`.
    #[must_use]
    pub fn settings(&self, settled_retention: Duration) -> LedgerSettings {
        LedgerSettings {
            history_cap: self.history_cap,
            lock_stale_after: Duration::from_millis(self.lock_stale_after_ms),
            lock_wait: Duration::from_millis(self.lock_wait_ms),
            settled_cap: self.settled_cap,
            settled_retention,
        }
    }
}
