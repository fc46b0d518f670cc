//! Bounded memory of transactions whose balance delta was applied.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::TransactionId;

/// One applied confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledEntry {
    pub id: TransactionId,
    pub settled_at: DateTime<Utc>,
}

/// Newest-first log of settled ids.
///
/// Keeps at least `cap` entries. Beyond the cap an entry is dropped only once
/// it is older than `retention`, so an id stays known for as long as the
/// confirmation gateway can still route a replay for it.
#[derive(Debug, Clone)]
pub(crate) struct SettledLog {
    cap: usize,
    retention: Duration,
    order: VecDeque<SettledEntry>,
    ids: HashSet<TransactionId>,
}

impl SettledLog {
    pub(crate) fn new(cap: usize, retention: Duration) -> Self {
        Self {
            cap,
            retention,
            order: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    /// Rebuild from entries in any order. Duplicate ids keep their newest time.
    pub(crate) fn from_entries(
        cap: usize,
        retention: Duration,
        entries: impl IntoIterator<Item = SettledEntry>,
    ) -> Self {
        let mut sorted: Vec<SettledEntry> = entries.into_iter().collect();
        sorted.sort_by(|a, b| b.settled_at.cmp(&a.settled_at));

        let mut log = Self::new(cap, retention);
        for entry in sorted {
            if log.ids.insert(entry.id.clone()) {
                log.order.push_back(entry);
            }
        }
        log.prune(Utc::now());
        log
    }

    pub(crate) fn contains(&self, id: &TransactionId) -> bool {
        self.ids.contains(id)
    }

    pub(crate) fn insert(&mut self, id: TransactionId) {
        self.insert_at(id, Utc::now());
    }

    fn insert_at(&mut self, id: TransactionId, settled_at: DateTime<Utc>) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_front(SettledEntry { id, settled_at });
        self.prune(settled_at);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        while self.order.len() > self.cap {
            let Some(oldest) = self.order.back() else {
                break;
            };
            let age = (now - oldest.settled_at).to_std().unwrap_or_default();
            if age < self.retention {
                break;
            }
            if let Some(dropped) = self.order.pop_back() {
                self.ids.remove(&dropped.id);
            }
        }
    }

    /// All entries, newest first.
    pub(crate) fn entries(&self) -> Vec<SettledEntry> {
        self.order.iter().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> TransactionId {
        TransactionId::new(format!("tx_{n}"))
    }

    #[test]
    fn oldest_beyond_cap_is_dropped_after_retention() {
        let mut log = SettledLog::new(2, Duration::ZERO);
        for n in 0..4 {
            log.insert(id(n));
        }
        assert_eq!(log.len(), 2);
        assert!(!log.contains(&id(0)));
        assert!(!log.contains(&id(1)));
        assert!(log.contains(&id(3)));
    }

    #[test]
    fn entries_inside_retention_outlive_the_cap() {
        let mut log = SettledLog::new(2, Duration::from_secs(60));
        for n in 0..5 {
            log.insert(id(n));
        }
        assert_eq!(log.len(), 5);
        assert!(log.contains(&id(0)));
    }

    #[test]
    fn expired_entries_go_once_a_newer_one_arrives() {
        let start = Utc::now();
        let mut log = SettledLog::new(1, Duration::from_secs(60));
        log.insert_at(id(0), start);
        log.insert_at(id(1), start + chrono::Duration::seconds(30));
        assert_eq!(log.len(), 2);

        log.insert_at(id(2), start + chrono::Duration::seconds(120));
        assert_eq!(log.len(), 1);
        assert!(log.contains(&id(2)));
    }

    #[test]
    fn duplicate_ids_are_stored_once() {
        let mut log = SettledLog::new(10, Duration::ZERO);
        log.insert(id(1));
        log.insert(id(1));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn rebuild_orders_newest_first() {
        let start = Utc::now();
        let log = SettledLog::from_entries(
            10,
            Duration::ZERO,
            vec![
                SettledEntry {
                    id: id(0),
                    settled_at: start,
                },
                SettledEntry {
                    id: id(1),
                    settled_at: start + chrono::Duration::seconds(5),
                },
                SettledEntry {
                    id: id(0),
                    settled_at: start - chrono::Duration::seconds(5),
                },
            ],
        );
        let ids: Vec<String> = log.entries().iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["tx_1", "tx_0"]);
    }
}
