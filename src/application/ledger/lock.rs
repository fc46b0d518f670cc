//! Logical locks keyed by resource name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct Held {
    acquired_at: Instant,
    token: u64,
}

#[derive(Default)]
struct Table {
    next_token: u64,
    held: HashMap<String, Held>,
}

/// Serializes conflicting operations on the same logical resource.
///
/// A lock older than `stale_after` is assumed abandoned and may be taken
/// over by the next acquirer. Waiters sleep until a guard is released or the
/// holder goes stale.
#[derive(Clone)]
pub struct LockRegistry {
    table: Arc<Mutex<Table>>,
    released: Arc<Notify>,
    stale_after: Duration,
    wait: Duration,
}

impl LockRegistry {
    #[must_use]
    pub fn new(stale_after: Duration, wait: Duration) -> Self {
        Self {
            table: Arc::default(),
            released: Arc::new(Notify::new()),
            stale_after,
            wait,
        }
    }

    /// Take the lock if it is free or stale.
    pub fn try_acquire(&self, key: &str) -> Option<LockGuard> {
        self.take(key).ok()
    }

    /// `Err` carries the instant at which the current holder goes stale.
    fn take(&self, key: &str) -> std::result::Result<LockGuard, Instant> {
        let mut table = self.table.lock();
        let now = Instant::now();

        if let Some(held) = table.held.get(key) {
            let age = now.duration_since(held.acquired_at);
            if age < self.stale_after {
                return Err(held.acquired_at + self.stale_after);
            }
            warn!(key, age_ms = age.as_millis() as u64, "Reclaiming stale lock");
        }

        table.next_token += 1;
        let token = table.next_token;
        table.held.insert(
            key.to_string(),
            Held {
                acquired_at: now,
                token,
            },
        );

        Ok(LockGuard {
            table: self.table.clone(),
            released: self.released.clone(),
            key: key.to_string(),
            token,
        })
    }

    /// Wait for the lock, failing with [`Error::LockTimeout`] after the
    /// configured wait.
    pub async fn acquire(&self, key: &str) -> Result<LockGuard> {
        let deadline = Instant::now() + self.wait;
        loop {
            // Registered before the attempt so a release in between is not lost.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let stale_at = match self.take(key) {
                Ok(guard) => return Ok(guard),
                Err(stale_at) => stale_at,
            };
            if Instant::now() >= deadline {
                warn!(key, wait_ms = self.wait.as_millis() as u64, "Lock wait timed out");
                return Err(Error::LockTimeout {
                    key: key.to_string(),
                });
            }
            let wake_at = tokio::time::Instant::from_std(deadline.min(stale_at));
            let _ = tokio::time::timeout_at(wake_at, released).await;
        }
    }

    #[must_use]
    pub fn is_locked(&self, key: &str) -> bool {
        self.table.lock().held.contains_key(key)
    }

    /// Number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().held.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its lock on drop, unless the lock was reclaimed meanwhile.
#[derive(Debug)]
pub struct LockGuard {
    table: Arc<Mutex<Table>>,
    released: Arc<Notify>,
    key: String,
    token: u64,
}

impl LockGuard {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let removed = {
            let mut table = self.table.lock();
            let ours = table.held.get(&self.key).is_some_and(|h| h.token == self.token);
            if ours {
                table.held.remove(&self.key);
            }
            ours
        };
        if removed {
            self.released.notify_waiters();
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("held", &self.held.len()).finish()
    }
}
