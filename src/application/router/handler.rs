//! Per-type dispatch to external providers.
//!
//! Handlers record the transaction, run the provider calls its type needs
//! and hand it to the confirmation gateway. None of them touches the
//! balance.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{PlannedTransaction, TransactionRouter};
use crate::application::ledger::TransactionUpdate;
use crate::domain::{PaymentSource, Transaction, TransactionKind, TransactionRequest, UserId};
use crate::error::{Error, ProviderError, Result};
use crate::port::KycStatus;

const CURRENCY: &str = "USD";

/// What a successful pre-submission step learned.
#[derive(Debug, Default)]
struct StepReport {
    provider_reference: Option<String>,
    asset_price: Option<Decimal>,
}

impl TransactionRouter {
    /// Record the planned transaction, run its provider steps and submit it.
    pub async fn dispatch(&self, planned: PlannedTransaction) -> Result<Transaction> {
        let PlannedTransaction {
            request,
            transaction,
            hold,
        } = planned;

        if let Err(e) = self.ledger.add_transaction(transaction.clone()) {
            if let Some(hold) = &hold {
                self.ledger.release(hold);
            }
            return Err(e);
        }

        let report = match self.run_provider_steps(transaction.user_id(), &request).await {
            Ok(report) => report,
            Err(e) => {
                return Ok(self.gateway.reject(&transaction, hold, &e.to_string()));
            }
        };

        let mut ready = transaction;
        if let Some(reference) = report.provider_reference {
            ready = self.record(&ready, TransactionUpdate::ProviderReference(reference));
        }
        if let Some(price) = report.asset_price {
            ready = self.record(&ready, TransactionUpdate::AssetPrice(price));
        }

        self.gateway.submit(ready, hold).await
    }

    fn record(&self, tx: &Transaction, update: TransactionUpdate) -> Transaction {
        match self.ledger.update_transaction(tx.user_id(), tx.id(), update) {
            Ok(record) => record,
            Err(e) => {
                warn!(tx_id = %tx.id(), error = %e, "Transaction record not updated");
                tx.clone()
            }
        }
    }

    async fn run_provider_steps(
        &self,
        user_id: &UserId,
        request: &TransactionRequest,
    ) -> Result<StepReport> {
        let mut report = StepReport::default();
        match request {
            TransactionRequest::Add { amount, method } => {
                self.require_kyc(user_id, TransactionKind::Add).await?;
                let receipt = self
                    .providers
                    .payment
                    .process_payment(*amount, CURRENCY, *method)
                    .await?;
                report.provider_reference = Some(receipt.id);
            }
            TransactionRequest::Withdraw {
                amount,
                destination,
            } => {
                self.require_kyc(user_id, TransactionKind::Withdraw).await?;
                let receipt = self
                    .providers
                    .payment
                    .process_withdrawal(*amount, CURRENCY, destination)
                    .await?;
                report.provider_reference = Some(receipt.id);
            }
            TransactionRequest::Send { .. }
            | TransactionRequest::Receive { .. }
            | TransactionRequest::Transfer { .. } => {}
            TransactionRequest::Buy {
                amount,
                asset,
                source,
            } => {
                if let PaymentSource::External(method) = source {
                    self.providers
                        .payment
                        .process_payment(*amount, CURRENCY, *method)
                        .await?;
                }
                let trade = self.providers.trading.buy_asset(asset, *amount).await?;
                report.provider_reference = Some(trade.id);
                report.asset_price = Some(trade.price);
            }
            TransactionRequest::Sell { amount, asset } => {
                let trade = self.providers.trading.sell_asset(asset, *amount).await?;
                report.provider_reference = Some(trade.id);
                report.asset_price = Some(trade.price);
            }
            TransactionRequest::Invest { amount, asset } => {
                let trade = self.providers.trading.purchase_asset(asset, *amount).await?;
                report.provider_reference = Some(trade.id);
                report.asset_price = Some(trade.price);
            }
        }
        report.asset_price = report.asset_price.filter(|p| !p.is_zero());
        Ok(report)
    }

    /// On- and off-ramps need a verified identity. An unverified user is
    /// sent into verification and the request fails.
    async fn require_kyc(&self, user_id: &UserId, kind: TransactionKind) -> Result<()> {
        let status = self.providers.kyc.check_status(user_id).await?;
        if status.is_verified() {
            return Ok(());
        }
        debug!(user_id = %user_id, status = status.as_str(), "Identity verification required");
        let status = match status {
            KycStatus::NotStarted => {
                self.providers
                    .kyc
                    .start_verification(user_id, kind.as_str())
                    .await?
            }
            other => other,
        };
        Err(Error::Provider(ProviderError::VerificationRequired {
            status: status.as_str().to_string(),
        }))
    }
}
