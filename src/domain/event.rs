//! Ledger events delivered to subscribers.

use serde::{Deserialize, Serialize};

use super::{Balance, Transaction, TransactionId, UserId};

/// Event type a subscriber registers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BalanceUpdated,
    TransactionAdded,
    TransactionUpdated,
    TransactionConfirmed,
    TransactionFailed,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::BalanceUpdated => "balance_updated",
            EventKind::TransactionAdded => "transaction_added",
            EventKind::TransactionUpdated => "transaction_updated",
            EventKind::TransactionConfirmed => "transaction_confirmed",
            EventKind::TransactionFailed => "transaction_failed",
        }
    }
}

/// An event with its payload. Payloads are copies, never live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    BalanceUpdated {
        user_id: UserId,
        balance: Balance,
        transaction_id: Option<TransactionId>,
    },
    TransactionAdded {
        transaction: Transaction,
    },
    TransactionUpdated {
        transaction: Transaction,
    },
    TransactionConfirmed {
        transaction: Transaction,
    },
    TransactionFailed {
        transaction: Transaction,
    },
}

impl LedgerEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::BalanceUpdated { .. } => EventKind::BalanceUpdated,
            LedgerEvent::TransactionAdded { .. } => EventKind::TransactionAdded,
            LedgerEvent::TransactionUpdated { .. } => EventKind::TransactionUpdated,
            LedgerEvent::TransactionConfirmed { .. } => EventKind::TransactionConfirmed,
            LedgerEvent::TransactionFailed { .. } => EventKind::TransactionFailed,
        }
    }

    /// User the event concerns.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        match self {
            LedgerEvent::BalanceUpdated { user_id, .. } => user_id,
            LedgerEvent::TransactionAdded { transaction }
            | LedgerEvent::TransactionUpdated { transaction }
            | LedgerEvent::TransactionConfirmed { transaction }
            | LedgerEvent::TransactionFailed { transaction } => transaction.user_id(),
        }
    }
}
