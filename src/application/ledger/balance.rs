//! The [`BalanceLedger`] and the records it keeps per user.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::{
    AssetSymbol, Balance, Chain, EventKind, FeeSchedule, LedgerEvent, Transaction, TransactionId,
    TransactionStatus, Usd, UserId,
};
use crate::error::{Error, Result};

use super::apply;
use super::bus::{EventBus, Subscription};
use super::history::TransactionHistory;
use super::lock::LockRegistry;
use super::settled::{SettledEntry, SettledLog};

/// Tunables for the ledger.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Maximum transaction records kept per user.
    pub history_cap: usize,
    /// Age after which a logical lock may be reclaimed.
    pub lock_stale_after: Duration,
    /// How long an acquirer waits for a held lock.
    pub lock_wait: Duration,
    /// Settled transaction ids remembered per user for duplicate detection.
    pub settled_cap: usize,
    /// Settled ids younger than this are kept even past `settled_cap`.
    /// Matches the gateway's terminal retention.
    pub settled_retention: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            history_cap: 100,
            lock_stale_after: Duration::from_secs(30),
            lock_wait: Duration::from_secs(5),
            settled_cap: 1000,
            settled_retention: Duration::from_secs(60),
        }
    }
}

/// Result of feeding a confirmation to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    /// The delta was applied; carries the new balance and the confirmed record.
    Applied {
        balance: Balance,
        transaction: Transaction,
    },
    /// The transaction had already been applied; nothing changed.
    AlreadyApplied,
}

/// Change to a transaction record that does not touch the balance.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionUpdate {
    ProviderReference(String),
    AssetPrice(Usd),
    Submitted {
        tx_hash: String,
        explorer_link: Option<String>,
    },
    Failed {
        error: String,
    },
    /// Confirmed on-chain, but the balance delta could not be applied.
    Unreconciled {
        error: String,
    },
}

impl TransactionUpdate {
    fn target(&self, current: TransactionStatus) -> TransactionStatus {
        match self {
            TransactionUpdate::ProviderReference(_) | TransactionUpdate::AssetPrice(_) => current,
            TransactionUpdate::Submitted { .. } => TransactionStatus::PendingConfirmation,
            TransactionUpdate::Failed { .. } => TransactionStatus::Failed,
            TransactionUpdate::Unreconciled { .. } => TransactionStatus::Confirmed,
        }
    }
}

/// Funds a reservation is held against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "of")]
pub enum ReservationKey {
    /// Stablecoin balance on one chain.
    Stable(Chain),
    /// USD value of one asset position.
    Asset(AssetSymbol),
}

/// Funds set aside for a pending transaction.
///
/// Released by the confirmation gateway when the transaction reaches a
/// terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct FundHold {
    user_id: UserId,
    lines: Vec<(ReservationKey, Usd)>,
}

impl FundHold {
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn lines(&self) -> &[(ReservationKey, Usd)] {
        &self.lines
    }

    #[must_use]
    pub fn total(&self) -> Usd {
        self.lines.iter().map(|(_, amount)| *amount).sum()
    }
}

/// Persisted shape of one user's ledger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub balance: Balance,
    /// Newest first.
    pub transactions: Vec<Transaction>,
    /// Applied confirmations, newest first. Outlives `transactions`.
    #[serde(default)]
    pub settled: Vec<SettledEntry>,
}

#[derive(Debug, Clone)]
enum BalanceRecord {
    Healthy(Balance),
    Corrupted { reason: String },
}

#[derive(Debug)]
struct Account {
    record: BalanceRecord,
    history: TransactionHistory,
    reservations: HashMap<ReservationKey, Usd>,
    /// Ids whose balance delta has been applied.
    settled: SettledLog,
}

impl Account {
    fn new(user_id: UserId, history_cap: usize, settled: SettledLog) -> Self {
        Self {
            record: BalanceRecord::Healthy(Balance::new(user_id)),
            history: TransactionHistory::new(history_cap),
            reservations: HashMap::new(),
            settled,
        }
    }

    fn balance(&self, user_id: &UserId) -> Result<&Balance> {
        match &self.record {
            BalanceRecord::Healthy(balance) => Ok(balance),
            BalanceRecord::Corrupted { reason } => Err(Error::BalanceCorruption {
                user_id: user_id.clone(),
                reason: reason.clone(),
            }),
        }
    }

    fn funds(&self, balance: &Balance, key: &ReservationKey) -> Usd {
        match key {
            ReservationKey::Stable(chain) => balance.chain(*chain).stable_amount,
            ReservationKey::Asset(symbol) => {
                balance.asset(symbol).map_or(Decimal::ZERO, |h| h.usd_value)
            }
        }
    }

    fn reserved(&self, key: &ReservationKey) -> Usd {
        self.reservations.get(key).copied().unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<UserId, Account>,
}

impl LedgerState {
    fn account(&self, user_id: &UserId) -> Result<&Account> {
        self.accounts.get(user_id).ok_or_else(|| Error::UnknownUser {
            user_id: user_id.clone(),
        })
    }

    fn account_mut(&mut self, user_id: &UserId) -> Result<&mut Account> {
        self.accounts
            .get_mut(user_id)
            .ok_or_else(|| Error::UnknownUser {
                user_id: user_id.clone(),
            })
    }
}

/// The single owner of every user's balance and transaction history.
///
/// Getters hand out copies. The balance changes only through
/// [`BalanceLedger::update_balance`] and, for the confirmation gateway,
/// [`BalanceLedger::apply_confirmed`].
pub struct BalanceLedger {
    state: Mutex<LedgerState>,
    bus: EventBus,
    locks: LockRegistry,
    fees: Arc<FeeSchedule>,
    history_cap: usize,
    settled_cap: usize,
    settled_retention: Duration,
}

impl BalanceLedger {
    #[must_use]
    pub fn new(settings: LedgerSettings, fees: Arc<FeeSchedule>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            bus: EventBus::new(),
            locks: LockRegistry::new(settings.lock_stale_after, settings.lock_wait),
            fees,
            history_cap: settings.history_cap.max(1),
            settled_cap: settings.settled_cap.max(settings.history_cap).max(1),
            settled_retention: settings.settled_retention,
        }
    }

    /// Logical locks shared with the router.
    #[must_use]
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    #[must_use]
    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Create a clean balance for the user, or return the existing one.
    pub fn open_session(&self, user_id: &UserId) -> Result<Balance> {
        let mut state = self.state.lock();
        let account = state
            .accounts
            .entry(user_id.clone())
            .or_insert_with(|| {
                info!(user_id = %user_id, "Balance session opened");
                Account::new(
                    user_id.clone(),
                    self.history_cap,
                    SettledLog::new(self.settled_cap, self.settled_retention),
                )
            });
        account.balance(user_id).cloned()
    }

    /// Drop the user's balance and history. Returns false if there was none.
    pub fn close_session(&self, user_id: &UserId) -> bool {
        let removed = self.state.lock().accounts.remove(user_id).is_some();
        if removed {
            info!(user_id = %user_id, "Balance session closed");
        }
        removed
    }

    /// Drop every session and subscriber.
    pub fn dispose(&self) {
        let dropped = {
            let mut state = self.state.lock();
            let count = state.accounts.len();
            state.accounts.clear();
            count
        };
        self.bus.clear();
        info!(sessions = dropped, "Ledger disposed");
    }

    /// Replace a corrupted (or any) balance with a clean one.
    ///
    /// History is kept; reservations are dropped.
    pub fn reinitialize(&self, user_id: &UserId) -> Result<Balance> {
        let balance = {
            let mut state = self.state.lock();
            let account = state.account_mut(user_id)?;
            let balance = Balance::new(user_id.clone());
            account.record = BalanceRecord::Healthy(balance.clone());
            account.reservations.clear();
            balance
        };
        warn!(user_id = %user_id, "Balance reinitialized");
        self.bus.emit(&LedgerEvent::BalanceUpdated {
            user_id: user_id.clone(),
            balance: balance.clone(),
            transaction_id: None,
        });
        Ok(balance)
    }

    pub fn get_balance(&self, user_id: &UserId) -> Result<Balance> {
        let state = self.state.lock();
        state.account(user_id)?.balance(user_id).cloned()
    }

    /// Apply a transaction's delta to the user's balance.
    ///
    /// Nothing changes unless the whole delta applies and the resulting
    /// balance satisfies every invariant. An invariant violation marks the
    /// record corrupted until [`BalanceLedger::reinitialize`].
    pub fn update_balance(&self, tx: &Transaction) -> Result<Balance> {
        apply::validate(tx, &self.fees)?;
        let balance = {
            let mut state = self.state.lock();
            let account = state.account_mut(tx.user_id())?;
            Self::commit(account, tx)?
        };
        self.bus.emit(&LedgerEvent::BalanceUpdated {
            user_id: tx.user_id().clone(),
            balance: balance.clone(),
            transaction_id: Some(tx.id().clone()),
        });
        Ok(balance)
    }

    /// Confirmation entry point. Applies the delta of `tx` exactly once.
    ///
    /// The fee snapshot carried by `tx` is used as-is. The history record, if
    /// still present, is marked confirmed in the same critical section.
    pub fn apply_confirmed(&self, tx: &Transaction) -> Result<ConfirmationOutcome> {
        apply::validate(tx, &self.fees)?;
        let (balance, confirmed) = {
            let mut state = self.state.lock();
            let account = state.account_mut(tx.user_id())?;
            if account.settled.contains(tx.id()) {
                debug!(tx_id = %tx.id(), "Duplicate confirmation ignored");
                return Ok(ConfirmationOutcome::AlreadyApplied);
            }
            let balance = Self::commit(account, tx)?;
            account.settled.insert(tx.id().clone());

            let confirmed = match account.history.get_mut(tx.id()) {
                Some(record) => {
                    record.mark_confirmed();
                    record.clone()
                }
                None => {
                    let mut record = tx.clone();
                    record.mark_confirmed();
                    record
                }
            };
            (balance, confirmed)
        };

        info!(
            user_id = %tx.user_id(),
            tx_id = %tx.id(),
            kind = %tx.kind(),
            amount = %tx.amount(),
            total_usd = %balance.total_usd(),
            "Transaction applied"
        );
        self.bus.emit(&LedgerEvent::BalanceUpdated {
            user_id: tx.user_id().clone(),
            balance: balance.clone(),
            transaction_id: Some(tx.id().clone()),
        });
        self.bus.emit(&LedgerEvent::TransactionConfirmed {
            transaction: confirmed.clone(),
        });
        Ok(ConfirmationOutcome::Applied {
            balance,
            transaction: confirmed,
        })
    }

    /// Returns true if the transaction's delta has been applied.
    #[must_use]
    pub fn is_settled(&self, user_id: &UserId, id: &TransactionId) -> bool {
        self.state
            .lock()
            .accounts
            .get(user_id)
            .is_some_and(|a| a.settled.contains(id))
    }

    fn commit(account: &mut Account, tx: &Transaction) -> Result<Balance> {
        let current = account.balance(tx.user_id())?;
        let mut next = current.clone();
        apply::apply(&mut next, tx)?;
        next.recompute();

        if let Err(reason) = next.check_invariants() {
            error!(
                user_id = %tx.user_id(),
                tx_id = %tx.id(),
                reason = %reason,
                "Balance invariant violated, record marked corrupted"
            );
            account.record = BalanceRecord::Corrupted {
                reason: reason.clone(),
            };
            return Err(Error::BalanceCorruption {
                user_id: tx.user_id().clone(),
                reason,
            });
        }

        account.record = BalanceRecord::Healthy(next.clone());
        Ok(next)
    }

    /// Record a new transaction, newest first.
    pub fn add_transaction(&self, tx: Transaction) -> Result<()> {
        {
            let mut state = self.state.lock();
            let account = state.account_mut(tx.user_id())?;
            account.history.push(tx.clone());
        }
        debug!(tx_id = %tx.id(), kind = %tx.kind(), "Transaction recorded");
        self.bus.emit(&LedgerEvent::TransactionAdded { transaction: tx });
        Ok(())
    }

    /// Apply a non-balance change to a transaction record.
    ///
    /// Terminal records are never moved again; a failed update leaves the
    /// record untouched.
    pub fn update_transaction(
        &self,
        user_id: &UserId,
        id: &TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction> {
        let record = {
            let mut state = self.state.lock();
            let account = state.account_mut(user_id)?;
            let record = account
                .history
                .get_mut(id)
                .ok_or_else(|| Error::TransactionNotFound { id: id.clone() })?;

            let from = record.status();
            let to = update.target(from);
            let allowed = match &update {
                TransactionUpdate::ProviderReference(_) | TransactionUpdate::AssetPrice(_) => {
                    from == TransactionStatus::PendingSubmission
                }
                TransactionUpdate::Submitted { .. } => from == TransactionStatus::PendingSubmission,
                TransactionUpdate::Failed { .. } | TransactionUpdate::Unreconciled { .. } => {
                    !from.is_terminal()
                }
            };
            if !allowed {
                return Err(Error::InvalidTransition {
                    id: id.clone(),
                    from,
                    to,
                });
            }

            match update {
                TransactionUpdate::ProviderReference(reference) => {
                    record.set_provider_reference(reference);
                }
                TransactionUpdate::AssetPrice(price) => record.set_asset_price(price),
                TransactionUpdate::Submitted {
                    tx_hash,
                    explorer_link,
                } => record.mark_submitted(tx_hash, explorer_link),
                TransactionUpdate::Failed { error } => record.mark_failed(error),
                TransactionUpdate::Unreconciled { error } => record.mark_unreconciled(error),
            }
            record.clone()
        };

        let event = match record.status() {
            TransactionStatus::Failed => LedgerEvent::TransactionFailed {
                transaction: record.clone(),
            },
            _ => LedgerEvent::TransactionUpdated {
                transaction: record.clone(),
            },
        };
        self.bus.emit(&event);
        Ok(record)
    }

    /// Up to `limit` records, newest first.
    pub fn get_transactions(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        let state = self.state.lock();
        Ok(state.account(user_id)?.history.recent(limit))
    }

    pub fn get_transaction(&self, user_id: &UserId, id: &TransactionId) -> Result<Transaction> {
        let state = self.state.lock();
        state
            .account(user_id)?
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| Error::TransactionNotFound { id: id.clone() })
    }

    /// Register a callback for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&LedgerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, callback)
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Set funds aside for a pending debit.
    ///
    /// Either every line fits within the funds not already reserved, or
    /// nothing is reserved and [`Error::InsufficientFunds`] is returned.
    pub fn reserve(&self, user_id: &UserId, lines: Vec<(ReservationKey, Usd)>) -> Result<FundHold> {
        let mut merged: Vec<(ReservationKey, Usd)> = Vec::with_capacity(lines.len());
        for (key, amount) in lines {
            if amount <= Decimal::ZERO {
                continue;
            }
            match merged.iter_mut().find(|(k, _)| *k == key) {
                Some((_, total)) => *total += amount,
                None => merged.push((key, amount)),
            }
        }

        let mut state = self.state.lock();
        let account = state.account_mut(user_id)?;
        let balance = account.balance(user_id)?;
        for (key, amount) in &merged {
            let free = account.funds(balance, key) - account.reserved(key);
            if free < *amount {
                debug!(user_id = %user_id, key = ?key, required = %amount, free = %free, "Reservation refused");
                return Err(Error::InsufficientFunds {
                    required: *amount,
                    available: free.max(Decimal::ZERO),
                });
            }
        }
        for (key, amount) in &merged {
            *account.reservations.entry(key.clone()).or_default() += *amount;
        }

        Ok(FundHold {
            user_id: user_id.clone(),
            lines: merged,
        })
    }

    /// Return held funds. A hold for a closed session is ignored.
    pub fn release(&self, hold: &FundHold) {
        let mut state = self.state.lock();
        let Some(account) = state.accounts.get_mut(&hold.user_id) else {
            debug!(user_id = %hold.user_id, "Release for closed session ignored");
            return;
        };
        for (key, amount) in &hold.lines {
            if let Some(reserved) = account.reservations.get_mut(key) {
                *reserved = (*reserved - *amount).max(Decimal::ZERO);
                if reserved.is_zero() {
                    account.reservations.remove(key);
                }
            }
        }
    }

    /// Amount currently reserved against one funding key.
    pub fn reserved(&self, user_id: &UserId, key: &ReservationKey) -> Result<Usd> {
        let state = self.state.lock();
        Ok(state.account(user_id)?.reserved(key))
    }

    /// Per-chain stable balance net of reservations.
    pub fn spendable_by_chain(&self, user_id: &UserId) -> Result<Vec<(Chain, Usd)>> {
        let state = self.state.lock();
        let account = state.account(user_id)?;
        let balance = account.balance(user_id)?;
        Ok(Chain::ALL
            .into_iter()
            .map(|chain| {
                let key = ReservationKey::Stable(chain);
                let free = account.funds(balance, &key) - account.reserved(&key);
                (chain, free.max(Decimal::ZERO))
            })
            .collect())
    }

    /// USD value of an asset position net of reservations.
    pub fn spendable_asset(&self, user_id: &UserId, symbol: &AssetSymbol) -> Result<Usd> {
        let state = self.state.lock();
        let account = state.account(user_id)?;
        let balance = account.balance(user_id)?;
        let key = ReservationKey::Asset(symbol.clone());
        Ok((account.funds(balance, &key) - account.reserved(&key)).max(Decimal::ZERO))
    }

    /// Export the user's balance and history.
    pub fn snapshot(&self, user_id: &UserId) -> Result<LedgerSnapshot> {
        let state = self.state.lock();
        let account = state.account(user_id)?;
        Ok(LedgerSnapshot {
            balance: account.balance(user_id)?.clone(),
            transactions: account.history.recent(self.history_cap),
            settled: account.settled.entries(),
        })
    }

    /// Load a previously exported state, replacing any current session.
    ///
    /// A snapshot whose balance breaks an invariant is refused.
    pub fn restore(&self, snapshot: LedgerSnapshot) -> Result<Balance> {
        let user_id = snapshot.balance.user_id().clone();
        if let Err(reason) = snapshot.balance.check_invariants() {
            warn!(user_id = %user_id, reason = %reason, "Refusing corrupted snapshot");
            return Err(Error::BalanceCorruption { user_id, reason });
        }
        if let Some(foreign) = snapshot.transactions.iter().find(|t| t.user_id() != &user_id) {
            return Err(Error::BalanceCorruption {
                user_id,
                reason: format!("transaction {} belongs to another user", foreign.id()),
            });
        }

        let from_history: Vec<SettledEntry> = snapshot
            .transactions
            .iter()
            .filter(|t| t.balance_update_applied())
            .map(|t| SettledEntry {
                id: t.id().clone(),
                settled_at: t.confirmed_at().unwrap_or_else(Utc::now),
            })
            .collect();
        let settled = SettledLog::from_entries(
            self.settled_cap,
            self.settled_retention,
            snapshot.settled.into_iter().chain(from_history),
        );
        let balance = snapshot.balance.clone();
        {
            let mut state = self.state.lock();
            state.accounts.insert(
                user_id.clone(),
                Account {
                    record: BalanceRecord::Healthy(snapshot.balance),
                    history: TransactionHistory::from_records(
                        self.history_cap,
                        snapshot.transactions,
                    ),
                    reservations: HashMap::new(),
                    settled,
                },
            );
        }
        info!(user_id = %user_id, total_usd = %balance.total_usd(), "Ledger state restored");
        self.bus.emit(&LedgerEvent::BalanceUpdated {
            user_id,
            balance: balance.clone(),
            transaction_id: None,
        });
        Ok(balance)
    }

    /// Number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&self, user_id: &UserId, reason: &str) {
        if let Some(account) = self.state.lock().accounts.get_mut(user_id) {
            account.record = BalanceRecord::Corrupted {
                reason: reason.to_string(),
            };
        }
    }
}
