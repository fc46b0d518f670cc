//! Typed event bus for ledger events.
//!
//! Callbacks are grouped by [`EventKind`]. A callback that returns an error
//! or panics is logged and dropped; its siblings still run.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::{EventKind, LedgerEvent};

/// A registered subscriber.
pub type EventCallback = Arc<dyn Fn(&LedgerEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: HashMap<EventKind, Vec<(u64, EventCallback)>>,
}

impl Registry {
    fn remove(&mut self, kind: EventKind, id: u64) -> bool {
        let Some(entries) = self.callbacks.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.callbacks.remove(&kind);
        }
        removed
    }
}

/// Broadcasts ledger events to subscribers in registration order.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&LedgerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .callbacks
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        debug!(kind = kind.as_str(), id, "Subscriber registered");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    /// Deliver an event to every subscriber of its kind.
    ///
    /// The registry lock is not held while callbacks run, so a callback may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: &LedgerEvent) {
        let kind = event.kind();
        let callbacks: Vec<(u64, EventCallback)> = match self.registry.lock().callbacks.get(&kind) {
            Some(entries) => entries.clone(),
            None => return,
        };

        let mut failed = Vec::new();
        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(kind = kind.as_str(), id, error = %e, "Subscriber failed, removing");
                    failed.push(id);
                }
                Err(_) => {
                    warn!(kind = kind.as_str(), id, "Subscriber panicked, removing");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut registry = self.registry.lock();
            for id in failed {
                registry.remove(kind, id);
            }
        }
    }

    /// Number of subscribers registered for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .callbacks
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Returns true if any subscriber is registered for the kind.
    #[must_use]
    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.registry.lock().callbacks.contains_key(&kind)
    }

    /// Drop every subscriber.
    pub fn clear(&self) {
        self.registry.lock().callbacks.clear();
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the callback. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.lock().remove(self.kind, self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::{Chain, Transaction, TransactionKind, UserId};
    use rust_decimal_macros::dec;

    fn added_event() -> LedgerEvent {
        LedgerEvent::TransactionAdded {
            transaction: Transaction::new(
                UserId::new("u"),
                TransactionKind::Add,
                dec!(10),
                Chain::Solana,
            ),
        }
    }

    #[test]
    fn delivers_to_every_subscriber_of_the_kind() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = count.clone();
            bus.subscribe(EventKind::TransactionAdded, move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        let other = count.clone();
        bus.subscribe(EventKind::BalanceUpdated, move |_| {
            other.fetch_add(100, Ordering::SeqCst);
            Ok(())
        });

        bus.emit(&added_event());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failing_subscriber_is_removed_without_blocking_siblings() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.subscribe(EventKind::TransactionAdded, |_| anyhow::bail!("broken"));
        bus.subscribe(EventKind::TransactionAdded, |_| panic!("boom"));
        let sibling = count.clone();
        bus.subscribe(EventKind::TransactionAdded, move |_| {
            sibling.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.emit(&added_event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(EventKind::TransactionAdded), 1);

        bus.emit(&added_event());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn last_unsubscribe_removes_the_kind() {
        let bus = EventBus::new();
        let first = bus.subscribe(EventKind::BalanceUpdated, |_| Ok(()));
        let second = bus.subscribe(EventKind::BalanceUpdated, |_| Ok(()));
        assert!(first.unsubscribe());
        assert!(bus.has_subscribers(EventKind::BalanceUpdated));
        assert!(second.unsubscribe());
        assert!(!bus.has_subscribers(EventKind::BalanceUpdated));
    }
}
