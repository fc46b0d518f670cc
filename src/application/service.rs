//! Transaction service: the surface exposed to the surrounding application.
//!
//! Owns the ledger, wallet, router and gateway for one process and wires
//! them together from [`ServiceSettings`] and a set of [`Providers`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::gateway::{ConfirmationGateway, GatewaySettings};
use super::ledger::{BalanceLedger, LedgerSettings, LedgerSnapshot, Subscription};
use super::router::{RoutingSettings, TransactionRouter};
use super::wallet::{MultiChainWallet, UnifiedBalance};
use crate::domain::{
    AssetCatalog, Balance, EventKind, FeeSchedule, LedgerEvent, Transaction, TransactionId,
    TransactionInput, TransactionStatus, UserId,
};
use crate::error::{Error, Result};
use crate::port::Providers;

/// Everything the service needs besides its providers.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub ledger: LedgerSettings,
    pub gateway: GatewaySettings,
    pub routing: RoutingSettings,
    pub fees: FeeSchedule,
    pub assets: AssetCatalog,
    /// Used when a caller awaits confirmation without its own timeout.
    pub confirmation_timeout: Duration,
}

/// Per-call options for [`TransactionService::process_transaction`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Wait for the transaction to be confirmed or failed before returning.
    pub await_confirmation: bool,
    pub confirmation_timeout: Option<Duration>,
}

impl ProcessOptions {
    #[must_use]
    pub fn awaiting_confirmation() -> Self {
        Self {
            await_confirmation: true,
            confirmation_timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = Some(timeout);
        self
    }
}

/// Result of processing one request.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    /// False when the transaction failed or its confirmation could not be
    /// reconciled with the ledger.
    pub success: bool,
    pub transaction_id: TransactionId,
    pub transaction: Transaction,
    /// Balance as of the moment the call returned.
    pub balance: Balance,
}

pub struct TransactionService {
    ledger: Arc<BalanceLedger>,
    wallet: Arc<MultiChainWallet>,
    gateway: ConfirmationGateway,
    router: TransactionRouter,
    confirmation_timeout: Duration,
    disposed: AtomicBool,
}

impl TransactionService {
    #[must_use]
    pub fn new(settings: ServiceSettings, providers: Providers) -> Self {
        let fees = Arc::new(settings.fees);
        let assets = Arc::new(settings.assets);
        let ledger = Arc::new(BalanceLedger::new(settings.ledger, Arc::clone(&fees)));
        let wallet = Arc::new(MultiChainWallet::new(
            Arc::clone(&ledger),
            Arc::clone(&fees),
            Arc::clone(&assets),
        ));
        let gateway = ConfirmationGateway::new(
            Arc::clone(&ledger),
            Arc::clone(&providers.chain),
            settings.gateway,
        );
        let router = TransactionRouter::new(
            Arc::clone(&ledger),
            Arc::clone(&wallet),
            gateway.clone(),
            providers,
            fees,
            assets,
            settings.routing,
        );

        Self {
            ledger,
            wallet,
            gateway,
            router,
            confirmation_timeout: settings.confirmation_timeout,
            disposed: AtomicBool::new(false),
        }
    }

    /// Start a balance session for a user.
    pub fn open_session(&self, user_id: &UserId) -> Result<Balance> {
        self.ensure_running()?;
        self.ledger.open_session(user_id)
    }

    pub fn close_session(&self, user_id: &UserId) -> bool {
        self.ledger.close_session(user_id)
    }

    /// Validate, plan and dispatch a request.
    ///
    /// Without `await_confirmation` the returned transaction is pending
    /// confirmation (or failed) and the balance is not yet updated.
    pub async fn process_transaction(
        &self,
        user_id: &UserId,
        input: &TransactionInput,
        options: ProcessOptions,
    ) -> Result<ProcessOutcome> {
        self.ensure_running()?;

        let mut transaction = self.router.route(user_id, input).await?;
        if options.await_confirmation && !transaction.status().is_terminal() {
            let timeout = options
                .confirmation_timeout
                .unwrap_or(self.confirmation_timeout);
            transaction = match self.gateway.await_terminal(transaction.id(), timeout).await {
                Ok(terminal) => terminal,
                // Already finished and released by the gateway.
                Err(Error::TransactionNotFound { .. }) => {
                    self.ledger.get_transaction(user_id, transaction.id())?
                }
                Err(e) => return Err(e),
            };
        }

        let success = transaction.status() != TransactionStatus::Failed
            && !transaction.reconciliation_required();
        if !success {
            warn!(
                user_id = %user_id,
                tx_id = %transaction.id(),
                error = transaction.error().unwrap_or("reconciliation required"),
                "Transaction unsuccessful"
            );
        }

        Ok(ProcessOutcome {
            success,
            transaction_id: transaction.id().clone(),
            balance: self.ledger.get_balance(user_id)?,
            transaction,
        })
    }

    pub fn get_balance(&self, user_id: &UserId) -> Result<Balance> {
        self.ledger.get_balance(user_id)
    }

    pub fn get_unified_balance(&self, user_id: &UserId) -> Result<UnifiedBalance> {
        self.wallet.get_unified_balance(user_id)
    }

    /// Newest-first history, at most `limit` records.
    pub fn get_transactions(&self, user_id: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        self.ledger.get_transactions(user_id, limit)
    }

    pub fn get_transaction(&self, user_id: &UserId, id: &TransactionId) -> Result<Transaction> {
        self.ledger.get_transaction(user_id, id)
    }

    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&LedgerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.ledger.subscribe(kind, callback)
    }

    /// Deliver an externally observed confirmation.
    pub fn confirm(&self, id: &TransactionId) -> Result<Transaction> {
        self.gateway.handle_confirmation(id)
    }

    /// Deliver an externally observed failure.
    pub fn fail(&self, id: &TransactionId, reason: &str) -> Result<Transaction> {
        self.gateway.handle_failure(id, reason)
    }

    pub fn reinitialize(&self, user_id: &UserId) -> Result<Balance> {
        self.ledger.reinitialize(user_id)
    }

    pub fn snapshot(&self, user_id: &UserId) -> Result<LedgerSnapshot> {
        self.ledger.snapshot(user_id)
    }

    pub fn restore(&self, snapshot: LedgerSnapshot) -> Result<Balance> {
        self.ensure_running()?;
        self.ledger.restore(snapshot)
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<BalanceLedger> {
        &self.ledger
    }

    #[must_use]
    pub fn wallet(&self) -> &Arc<MultiChainWallet> {
        &self.wallet
    }

    #[must_use]
    pub fn gateway(&self) -> &ConfirmationGateway {
        &self.gateway
    }

    /// Stop polling, drop every session and subscriber. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.gateway.shutdown();
        self.ledger.dispose();
        info!("Transaction service disposed");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::ShuttingDown);
        }
        Ok(())
    }
}

impl Drop for TransactionService {
    fn drop(&mut self) {
        if !self.gateway.is_shut_down() {
            self.gateway.shutdown();
        }
    }
}
