//! Request validation, route selection and fund reservation.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::application::gateway::ConfirmationGateway;
use crate::application::ledger::{BalanceLedger, FundHold, ReservationKey};
use crate::application::wallet::MultiChainWallet;
use crate::domain::error::ValidationError;
use crate::domain::{
    AssetCatalog, AssetSymbol, Chain, FeeQuote, FeeSchedule, RouteExecution, Transaction,
    TransactionInput, TransactionRequest, Usd, UserId,
};
use crate::error::{Error, Result};
use crate::port::Providers;

/// Routing defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingSettings {
    /// Chain credited by add and receive, and the destination of withdraw
    /// and send.
    pub default_chain: Chain,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            default_chain: Chain::Solana,
        }
    }
}

/// A transaction ready for dispatch, with its funds set aside.
#[derive(Debug)]
pub struct PlannedTransaction {
    pub request: TransactionRequest,
    pub transaction: Transaction,
    pub hold: Option<FundHold>,
}

pub struct TransactionRouter {
    pub(super) ledger: Arc<BalanceLedger>,
    wallet: Arc<MultiChainWallet>,
    pub(super) gateway: ConfirmationGateway,
    pub(super) providers: Providers,
    fees: Arc<FeeSchedule>,
    assets: Arc<AssetCatalog>,
    settings: RoutingSettings,
}

impl TransactionRouter {
    #[must_use]
    pub fn new(
        ledger: Arc<BalanceLedger>,
        wallet: Arc<MultiChainWallet>,
        gateway: ConfirmationGateway,
        providers: Providers,
        fees: Arc<FeeSchedule>,
        assets: Arc<AssetCatalog>,
        settings: RoutingSettings,
    ) -> Self {
        Self {
            ledger,
            wallet,
            gateway,
            providers,
            fees,
            assets,
            settings,
        }
    }

    /// Run a request through its whole lifecycle.
    ///
    /// Validation, funding and fee errors are returned before anything is
    /// recorded. Once a transaction is recorded, provider failures end it as
    /// failed and the failed record is returned.
    pub async fn route(&self, user_id: &UserId, input: &TransactionInput) -> Result<Transaction> {
        let request = self.validate(input)?;
        let planned = {
            let _guard = self.ledger.locks().acquire(&balance_lock(user_id)).await?;
            self.plan(user_id, request)?
        };
        info!(
            user_id = %user_id,
            tx_id = %planned.transaction.id(),
            kind = %planned.transaction.kind(),
            amount = %planned.transaction.amount(),
            fees = %planned.transaction.fees().total(),
            chain = %planned.transaction.chain(),
            "Transaction planned"
        );
        self.dispatch(planned).await
    }

    pub fn validate(&self, input: &TransactionInput) -> Result<TransactionRequest> {
        Ok(TransactionRequest::parse(input, &self.fees, &self.assets)?)
    }

    /// Chain the transaction settles on.
    #[must_use]
    pub fn destination_chain(&self, request: &TransactionRequest) -> Chain {
        match request {
            TransactionRequest::Transfer { address, .. } => address.chain(),
            _ => request
                .asset()
                .and_then(|symbol| self.assets.get(symbol))
                .map_or(self.settings.default_chain, |info| info.chain),
        }
    }

    /// Select a route, compute fees and reserve funds.
    ///
    /// Callers hold the user's balance lock.
    pub fn plan(&self, user_id: &UserId, request: TransactionRequest) -> Result<PlannedTransaction> {
        let amount = request.amount();
        let destination = self.destination_chain(&request);

        let route = if request.debits_available() {
            Some(self.select_route(user_id, amount, destination)?)
        } else {
            None
        };

        if let TransactionRequest::Sell { asset, .. } = &request {
            let held = self.ledger.spendable_asset(user_id, asset)?;
            if held < amount {
                return Err(Error::InsufficientFunds {
                    required: amount,
                    available: held,
                });
            }
        }

        let chains: Vec<Chain> = match &route {
            Some(route) => vec![route.from_chain, route.to_chain],
            None => vec![destination],
        };
        let routing = route.as_ref().map_or(Decimal::ZERO, |r| r.routing_fee);
        let fees = self.fees.quote(FeeQuote {
            kind: request.kind(),
            amount,
            chains: &chains,
            uses_payment_provider: request.uses_payment_provider(),
            routing,
        });
        if fees.total() > amount {
            return Err(ValidationError::FeesExceedAmount {
                amount,
                fees: fees.total(),
            }
            .into());
        }

        let lines = self.reservation_lines(&request, route.as_ref());
        let hold = if lines.is_empty() {
            None
        } else {
            Some(self.ledger.reserve(user_id, lines)?)
        };

        let mut tx = Transaction::new(user_id.clone(), request.kind(), amount, destination)
            .with_fees(fees);
        if let Some(symbol) = request.asset() {
            tx = tx.with_asset(symbol.clone(), self.reference_price(symbol));
        }
        if let TransactionRequest::Buy { source, .. } = &request {
            tx = tx.with_payment_source(*source);
        }
        if let Some(route) = route {
            tx = tx.with_route(route);
        }
        if let Some(counterparty) = request.counterparty() {
            tx = tx.with_counterparty(counterparty);
        }

        Ok(PlannedTransaction {
            request,
            transaction: tx,
            hold,
        })
    }

    fn select_route(&self, user_id: &UserId, amount: Usd, destination: Chain) -> Result<RouteExecution> {
        let options =
            self.wallet
                .find_routing_options(user_id, amount, &AssetSymbol::usdc(), destination)?;
        let Some(plan) = options.first() else {
            let available: Usd = self
                .ledger
                .spendable_by_chain(user_id)?
                .into_iter()
                .map(|(_, free)| free)
                .sum();
            debug!(user_id = %user_id, amount = %amount, available = %available, "No feasible route");
            return Err(Error::InsufficientFunds {
                required: amount,
                available,
            });
        };
        self.wallet.execute_routing(user_id, plan)
    }

    fn reservation_lines(
        &self,
        request: &TransactionRequest,
        route: Option<&RouteExecution>,
    ) -> Vec<(ReservationKey, Usd)> {
        let mut lines: Vec<(ReservationKey, Usd)> = route
            .map(|r| {
                r.debits
                    .iter()
                    .map(|d| (ReservationKey::Stable(d.chain), d.amount))
                    .collect()
            })
            .unwrap_or_default();
        if let TransactionRequest::Sell { asset, amount } = request {
            lines.push((ReservationKey::Asset(asset.clone()), *amount));
        }
        lines
    }

    fn reference_price(&self, symbol: &AssetSymbol) -> Usd {
        self.assets
            .get(symbol)
            .map_or(Decimal::ZERO, |info| info.reference_price)
    }
}

/// Logical lock key serializing planning for one user.
#[must_use]
pub fn balance_lock(user_id: &UserId) -> String {
    format!("balance:{user_id}")
}
