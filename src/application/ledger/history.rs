//! Capped, newest-first transaction history.

use std::collections::VecDeque;

use crate::domain::{Transaction, TransactionId};

/// Ring buffer of transaction records. The oldest entry is dropped once the
/// cap is reached.
#[derive(Debug, Clone)]
pub(crate) struct TransactionHistory {
    cap: usize,
    entries: VecDeque<Transaction>,
}

impl TransactionHistory {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: VecDeque::with_capacity(cap.min(128)),
        }
    }

    /// Rebuild from records ordered newest-first.
    pub(crate) fn from_records(cap: usize, records: Vec<Transaction>) -> Self {
        let mut entries: VecDeque<Transaction> = records.into();
        entries.truncate(cap);
        Self { cap, entries }
    }

    pub(crate) fn push(&mut self, tx: Transaction) {
        self.entries.push_front(tx);
        self.entries.truncate(self.cap);
    }

    pub(crate) fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.entries.iter().find(|tx| tx.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &TransactionId) -> Option<&mut Transaction> {
        self.entries.iter_mut().find(|tx| tx.id() == id)
    }

    /// Up to `limit` records, newest first.
    pub(crate) fn recent(&self, limit: usize) -> Vec<Transaction> {
        self.entries.iter().take(limit).cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
