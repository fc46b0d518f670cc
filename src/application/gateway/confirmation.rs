//! Submission tracking and terminal-state bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::ledger::{BalanceLedger, ConfirmationOutcome, FundHold, TransactionUpdate};
use crate::domain::{Transaction, TransactionId};
use crate::error::{Error, Result};
use crate::port::{ChainStatusProvider, TransactionDescriptor};

use super::poll::{self, PollOutcome, PollPolicy};

/// Gateway tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    pub poll: PollPolicy,
    /// How long terminal records stay inspectable.
    pub retention: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            retention: Duration::from_millis(60_000),
        }
    }
}

struct Progress {
    finished: bool,
    hold: Option<FundHold>,
    /// Latest known record.
    latest: Transaction,
}

struct PendingEntry {
    /// Record as submitted; its fee snapshot is what confirmation applies.
    submitted: Mutex<Transaction>,
    progress: Mutex<Progress>,
    terminal: watch::Sender<Option<Transaction>>,
    cancel: CancellationToken,
}

impl PendingEntry {
    /// Take the terminal transition and the hold. Ledger calls emit events
    /// synchronously, so the progress lock is released before they run.
    /// `Err` carries the latest record when another caller got there first.
    fn claim(&self) -> std::result::Result<Option<FundHold>, Transaction> {
        let mut progress = self.progress.lock();
        if progress.finished {
            return Err(progress.latest.clone());
        }
        progress.finished = true;
        Ok(progress.hold.take())
    }
}

struct GatewayInner {
    ledger: Arc<BalanceLedger>,
    chain: Arc<dyn ChainStatusProvider>,
    settings: GatewaySettings,
    entries: DashMap<TransactionId, Arc<PendingEntry>>,
    shutdown: CancellationToken,
}

/// Submits transactions and turns on-chain outcomes into ledger updates.
#[derive(Clone)]
pub struct ConfirmationGateway {
    inner: Arc<GatewayInner>,
}

impl ConfirmationGateway {
    #[must_use]
    pub fn new(
        ledger: Arc<BalanceLedger>,
        chain: Arc<dyn ChainStatusProvider>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                ledger,
                chain,
                settings,
                entries: DashMap::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Submit a recorded transaction and start monitoring it.
    ///
    /// A submission failure moves the record straight to failed, with no
    /// balance effect. The returned record is either pending confirmation
    /// or failed.
    pub async fn submit(&self, tx: Transaction, hold: Option<FundHold>) -> Result<Transaction> {
        if self.inner.shutdown.is_cancelled() {
            let failed = self.reject(&tx, hold, "gateway is shut down");
            debug!(tx_id = %failed.id(), "Submission refused during shutdown");
            return Err(Error::ShuttingDown);
        }

        let (terminal, _) = watch::channel(None);
        let entry = Arc::new(PendingEntry {
            submitted: Mutex::new(tx.clone()),
            progress: Mutex::new(Progress {
                finished: false,
                hold,
                latest: tx.clone(),
            }),
            terminal,
            cancel: self.inner.shutdown.child_token(),
        });
        self.inner.entries.insert(tx.id().clone(), entry.clone());

        let descriptor = TransactionDescriptor::from(&tx);
        let receipt = match self.inner.chain.submit_transaction(&descriptor).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(tx_id = %tx.id(), error = %e, "Submission failed");
                return Ok(self.inner.finish_failed(&entry, tx.id(), e.to_string()));
            }
        };

        let submitted = match self.inner.ledger.update_transaction(
            tx.user_id(),
            tx.id(),
            TransactionUpdate::Submitted {
                tx_hash: receipt.tx_hash.clone(),
                explorer_link: receipt.explorer_link.clone(),
            },
        ) {
            Ok(record) => record,
            Err(e) => {
                warn!(tx_id = %tx.id(), error = %e, "Submitted record not updated in history");
                let mut record = tx.clone();
                record.mark_submitted(receipt.tx_hash.clone(), receipt.explorer_link.clone());
                record
            }
        };
        *entry.submitted.lock() = submitted.clone();
        {
            let mut progress = entry.progress.lock();
            if !progress.finished {
                progress.latest = submitted.clone();
            }
        }

        info!(
            tx_id = %tx.id(),
            tx_hash = %receipt.tx_hash,
            chain = %tx.chain(),
            "Transaction submitted"
        );

        let inner = self.inner.clone();
        let id = tx.id().clone();
        let cancel = entry.cancel.clone();
        tokio::spawn(async move {
            let outcome = poll::poll_until_terminal(
                inner.chain.clone(),
                &receipt.tx_hash,
                &inner.settings.poll,
                cancel,
            )
            .await;
            match outcome {
                PollOutcome::Confirmed { confirmations } => {
                    debug!(tx_id = %id, confirmations, "Confirmed on chain");
                    if let Err(e) = inner.confirm(&id) {
                        warn!(tx_id = %id, error = %e, "Confirmation not processed");
                    }
                }
                PollOutcome::Failed { reason } | PollOutcome::Exhausted { reason } => {
                    if let Err(e) = inner.fail(&id, reason) {
                        warn!(tx_id = %id, error = %e, "Failure not processed");
                    }
                }
                PollOutcome::Cancelled => debug!(tx_id = %id, "Polling cancelled"),
            }
        });

        Ok(submitted)
    }

    /// Fail a transaction that never reached submission.
    pub fn reject(&self, tx: &Transaction, hold: Option<FundHold>, error: &str) -> Transaction {
        if let Some(hold) = hold {
            self.inner.ledger.release(&hold);
        }
        warn!(tx_id = %tx.id(), kind = %tx.kind(), error, "Transaction rejected");
        match self.inner.ledger.update_transaction(
            tx.user_id(),
            tx.id(),
            TransactionUpdate::Failed {
                error: error.to_string(),
            },
        ) {
            Ok(record) => record,
            Err(e) => {
                debug!(tx_id = %tx.id(), error = %e, "Rejected record not in history");
                let mut record = tx.clone();
                record.mark_failed(error.to_string());
                record
            }
        }
    }

    /// Handle a confirmation signal. Duplicate signals are no-ops.
    pub fn handle_confirmation(&self, id: &TransactionId) -> Result<Transaction> {
        self.inner.confirm(id)
    }

    /// Handle a failure signal for a pending transaction.
    pub fn handle_failure(&self, id: &TransactionId, reason: &str) -> Result<Transaction> {
        self.inner.fail(id, reason.to_string())
    }

    /// Wait until the transaction is confirmed or failed.
    pub async fn await_terminal(&self, id: &TransactionId, timeout: Duration) -> Result<Transaction> {
        let mut receiver = self
            .inner
            .entries
            .get(id)
            .map(|entry| entry.terminal.subscribe())
            .ok_or_else(|| Error::TransactionNotFound { id: id.clone() })?;

        let waited = tokio::time::timeout(timeout, async {
            receiver
                .wait_for(Option::is_some)
                .await
                .map(|terminal| (*terminal).clone())
        })
        .await;

        match waited {
            Ok(Ok(Some(tx))) => Ok(tx),
            Ok(Ok(None) | Err(_)) => Err(Error::TransactionNotFound { id: id.clone() }),
            Err(_) => Err(Error::ConfirmationTimeout { id: id.clone() }),
        }
    }

    /// Latest known record for a tracked transaction.
    #[must_use]
    pub fn state(&self, id: &TransactionId) -> Option<Transaction> {
        self.inner
            .entries
            .get(id)
            .map(|entry| entry.progress.lock().latest.clone())
    }

    /// Transactions still waiting for a terminal state.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|entry| !entry.progress.lock().finished)
            .count()
    }

    /// Tracked transactions, including terminal ones still retained.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.inner.entries.len()
    }

    /// Cancel every polling task. New submissions are refused afterwards.
    pub fn shutdown(&self) {
        let pending = self.pending_count();
        self.inner.shutdown.cancel();
        info!(pending, "Confirmation gateway shut down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl GatewayInner {
    fn entry(&self, id: &TransactionId) -> Result<Arc<PendingEntry>> {
        self.entries
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::TransactionNotFound { id: id.clone() })
    }

    fn confirm(self: &Arc<Self>, id: &TransactionId) -> Result<Transaction> {
        let entry = self.entry(id)?;
        let hold = match entry.claim() {
            Ok(hold) => hold,
            Err(latest) => {
                debug!(tx_id = %id, "Confirmation for finished transaction ignored");
                return Ok(latest);
            }
        };

        let submitted = entry.submitted.lock().clone();
        let record = match self.ledger.apply_confirmed(&submitted) {
            Ok(ConfirmationOutcome::Applied { transaction, .. }) => transaction,
            Ok(ConfirmationOutcome::AlreadyApplied) => self
                .ledger
                .get_transaction(submitted.user_id(), id)
                .unwrap_or_else(|_| submitted.clone()),
            Err(e) => {
                error!(
                    tx_id = %id,
                    user_id = %submitted.user_id(),
                    kind = %submitted.kind(),
                    amount = %submitted.amount(),
                    error = %e,
                    "Confirmed on chain but balance update failed; reconciliation required"
                );
                let reason = e.to_string();
                self.ledger
                    .update_transaction(
                        submitted.user_id(),
                        id,
                        TransactionUpdate::Unreconciled {
                            error: reason.clone(),
                        },
                    )
                    .unwrap_or_else(|_| {
                        let mut record = submitted.clone();
                        record.mark_unreconciled(reason);
                        record
                    })
            }
        };
        self.finish(&entry, id, hold, record.clone());
        Ok(record)
    }

    fn fail(self: &Arc<Self>, id: &TransactionId, reason: String) -> Result<Transaction> {
        let entry = self.entry(id)?;
        Ok(self.finish_failed(&entry, id, reason))
    }

    fn finish_failed(
        self: &Arc<Self>,
        entry: &Arc<PendingEntry>,
        id: &TransactionId,
        reason: String,
    ) -> Transaction {
        let hold = match entry.claim() {
            Ok(hold) => hold,
            Err(latest) => return latest,
        };
        let submitted = entry.submitted.lock().clone();
        warn!(tx_id = %id, reason = %reason, "Transaction failed");
        let record = self
            .ledger
            .update_transaction(
                submitted.user_id(),
                id,
                TransactionUpdate::Failed {
                    error: reason.clone(),
                },
            )
            .unwrap_or_else(|_| {
                let mut record = submitted.clone();
                record.mark_failed(reason);
                record
            });
        self.finish(entry, id, hold, record.clone());
        record
    }

    /// Terminal bookkeeping shared by every outcome. Runs after the ledger
    /// call, with no entry lock held across it.
    fn finish(
        self: &Arc<Self>,
        entry: &Arc<PendingEntry>,
        id: &TransactionId,
        hold: Option<FundHold>,
        record: Transaction,
    ) {
        if let Some(hold) = hold {
            self.ledger.release(&hold);
        }
        entry.progress.lock().latest = record.clone();
        entry.cancel.cancel();
        entry.terminal.send_replace(Some(record));
        self.schedule_release(id.clone());
    }

    fn schedule_release(self: &Arc<Self>, id: TransactionId) {
        let retention = self.settings.retention;
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) if !retention.is_zero() => handle,
            _ => {
                self.entries.remove(&id);
                return;
            }
        };
        let inner = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        handle.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(retention) => {}
                () = shutdown.cancelled() => {}
            }
            if let Some(inner) = inner.upgrade() {
                inner.entries.remove(&id);
                debug!(tx_id = %id, "Terminal record released");
            }
        });
    }
}
