//! Transaction records and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::{AssetSymbol, Chain, RouteExecution, TransactionId, Usd, UserId};

/// The eight supported transaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Add,
    Withdraw,
    Send,
    Receive,
    Transfer,
    Buy,
    Sell,
    Invest,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 8] = [
        TransactionKind::Add,
        TransactionKind::Withdraw,
        TransactionKind::Send,
        TransactionKind::Receive,
        TransactionKind::Transfer,
        TransactionKind::Buy,
        TransactionKind::Sell,
        TransactionKind::Invest,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Add => "add",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Send => "send",
            TransactionKind::Receive => "receive",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Buy => "buy",
            TransactionKind::Sell => "sell",
            TransactionKind::Invest => "invest",
        }
    }

    /// History category derived from the type.
    #[must_use]
    pub const fn category(&self) -> TransactionCategory {
        match self {
            TransactionKind::Add | TransactionKind::Withdraw => TransactionCategory::Banking,
            TransactionKind::Send | TransactionKind::Receive | TransactionKind::Transfer => {
                TransactionCategory::Transfer
            }
            TransactionKind::Buy | TransactionKind::Sell | TransactionKind::Invest => {
                TransactionCategory::Investment
            }
        }
    }

    /// Add and withdraw cross the fiat boundary.
    #[must_use]
    pub const fn is_ramp(&self) -> bool {
        matches!(self, TransactionKind::Add | TransactionKind::Withdraw)
    }

    /// Types that require an allow-listed asset.
    #[must_use]
    pub const fn requires_asset(&self) -> bool {
        matches!(
            self,
            TransactionKind::Buy | TransactionKind::Sell | TransactionKind::Invest
        )
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| ValidationError::UnknownTransactionType {
                value: s.to_string(),
            })
    }
}

/// History grouping, tagged automatically from the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionCategory {
    Banking,
    Transfer,
    Investment,
}

/// Persistent status of a transaction record.
///
/// `PendingSubmission -> PendingConfirmation -> {Confirmed | Failed}`.
/// A submission failure goes straight from `PendingSubmission` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    PendingSubmission,
    PendingConfirmation,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Confirmed | TransactionStatus::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::PendingSubmission => "pending_submission",
            TransactionStatus::PendingConfirmation => "pending_confirmation",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Fee breakdown captured once, before submission.
///
/// Fields are private so a snapshot cannot be edited after capture; the
/// total is always the sum of its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSnapshot {
    diboas: Usd,
    network: Usd,
    provider: Usd,
    routing: Usd,
    total: Usd,
}

impl FeeSnapshot {
    #[must_use]
    pub fn new(diboas: Usd, network: Usd, provider: Usd, routing: Usd) -> Self {
        Self {
            diboas,
            network,
            provider,
            routing,
            total: diboas + network + provider + routing,
        }
    }

    /// A snapshot with only a platform fee, convenient for direct ledger use.
    #[must_use]
    pub fn flat(total: Usd) -> Self {
        Self::new(total, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn diboas(&self) -> Usd {
        self.diboas
    }

    #[must_use]
    pub fn network(&self) -> Usd {
        self.network
    }

    #[must_use]
    pub fn provider(&self) -> Usd {
        self.provider
    }

    #[must_use]
    pub fn routing(&self) -> Usd {
        self.routing
    }

    #[must_use]
    pub fn total(&self) -> Usd {
        self.total
    }
}

/// Off-platform payment instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    ApplePay,
    GooglePay,
    Paypal,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::ApplePay => "apple_pay",
            PaymentMethod::GooglePay => "google_pay",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "card" | "credit_card" | "debit_card" => Ok(PaymentMethod::Card),
            "bank" | "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "apple_pay" => Ok(PaymentMethod::ApplePay),
            "google_pay" => Ok(PaymentMethod::GooglePay),
            "paypal" => Ok(PaymentMethod::Paypal),
            _ => Err(ValidationError::InvalidPaymentMethod {
                value: s.to_string(),
            }),
        }
    }
}

/// Where a purchase is funded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "method")]
pub enum PaymentSource {
    /// The user's available balance.
    Wallet,
    /// An external instrument; available balance is untouched.
    External(PaymentMethod),
}

impl PaymentSource {
    #[must_use]
    pub const fn is_wallet(&self) -> bool {
        matches!(self, PaymentSource::Wallet)
    }
}

/// Asset leg of a buy, sell or invest transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTrade {
    pub symbol: AssetSymbol,
    /// USD price per unit, fixed at submission like the fee snapshot.
    pub price: Usd,
}

/// A transaction record owned by the ledger's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    user_id: UserId,
    kind: TransactionKind,
    category: TransactionCategory,
    amount: Usd,
    net_amount: Option<Usd>,
    fees: FeeSnapshot,
    status: TransactionStatus,
    chain: Chain,
    asset: Option<AssetTrade>,
    payment_source: Option<PaymentSource>,
    route: Option<RouteExecution>,
    counterparty: Option<String>,
    provider_reference: Option<String>,
    tx_hash: Option<String>,
    explorer_link: Option<String>,
    error: Option<String>,
    balance_update_applied: bool,
    reconciliation_required: bool,
    created_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a pending transaction with zero fees.
    #[must_use]
    pub fn new(user_id: UserId, kind: TransactionKind, amount: Usd, chain: Chain) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            kind,
            category: kind.category(),
            amount,
            net_amount: None,
            fees: FeeSnapshot::zero(),
            status: TransactionStatus::PendingSubmission,
            chain,
            asset: None,
            payment_source: None,
            route: None,
            counterparty: None,
            provider_reference: None,
            tx_hash: None,
            explorer_link: None,
            error: None,
            balance_update_applied: false,
            reconciliation_required: false,
            created_at: Utc::now(),
            submitted_at: None,
            confirmed_at: None,
            failed_at: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_fees(mut self, fees: FeeSnapshot) -> Self {
        self.fees = fees;
        self
    }

    /// Supply the net value explicitly instead of `amount - fees.total`.
    #[must_use]
    pub fn with_net_amount(mut self, net: Usd) -> Self {
        self.net_amount = Some(net);
        self
    }

    #[must_use]
    pub fn with_asset(mut self, symbol: AssetSymbol, price: Usd) -> Self {
        self.asset = Some(AssetTrade { symbol, price });
        self
    }

    #[must_use]
    pub fn with_payment_source(mut self, source: PaymentSource) -> Self {
        self.payment_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_route(mut self, route: RouteExecution) -> Self {
        self.route = Some(route);
        self
    }

    #[must_use]
    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    #[must_use]
    pub fn category(&self) -> TransactionCategory {
        self.category
    }

    #[must_use]
    pub fn amount(&self) -> Usd {
        self.amount
    }

    /// Value credited to the user: the pre-supplied net or `amount - fees`.
    #[must_use]
    pub fn net_amount(&self) -> Usd {
        self.net_amount
            .unwrap_or_else(|| self.amount - self.fees.total())
    }

    #[must_use]
    pub fn fees(&self) -> &FeeSnapshot {
        &self.fees
    }

    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    #[must_use]
    pub fn chain(&self) -> Chain {
        self.chain
    }

    #[must_use]
    pub fn asset(&self) -> Option<&AssetTrade> {
        self.asset.as_ref()
    }

    #[must_use]
    pub fn payment_source(&self) -> Option<PaymentSource> {
        self.payment_source
    }

    #[must_use]
    pub fn route(&self) -> Option<&RouteExecution> {
        self.route.as_ref()
    }

    #[must_use]
    pub fn counterparty(&self) -> Option<&str> {
        self.counterparty.as_deref()
    }

    #[must_use]
    pub fn provider_reference(&self) -> Option<&str> {
        self.provider_reference.as_deref()
    }

    #[must_use]
    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    #[must_use]
    pub fn explorer_link(&self) -> Option<&str> {
        self.explorer_link.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn balance_update_applied(&self) -> bool {
        self.balance_update_applied
    }

    #[must_use]
    pub fn reconciliation_required(&self) -> bool {
        self.reconciliation_required
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    #[must_use]
    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    /// Returns true if applying this transaction draws on available balance.
    #[must_use]
    pub fn debits_available(&self) -> bool {
        match self.kind {
            TransactionKind::Withdraw
            | TransactionKind::Send
            | TransactionKind::Transfer
            | TransactionKind::Invest => true,
            TransactionKind::Buy => self.payment_source.unwrap_or(PaymentSource::Wallet).is_wallet(),
            TransactionKind::Add | TransactionKind::Receive | TransactionKind::Sell => false,
        }
    }

    pub(crate) fn set_provider_reference(&mut self, reference: impl Into<String>) {
        self.provider_reference = Some(reference.into());
    }

    pub(crate) fn set_asset_price(&mut self, price: Usd) {
        if let Some(asset) = self.asset.as_mut() {
            asset.price = price;
        }
    }

    pub(crate) fn mark_submitted(&mut self, tx_hash: String, explorer_link: Option<String>) {
        self.status = TransactionStatus::PendingConfirmation;
        self.tx_hash = Some(tx_hash);
        self.explorer_link = explorer_link;
        self.submitted_at = Some(Utc::now());
    }

    pub(crate) fn mark_confirmed(&mut self) {
        self.status = TransactionStatus::Confirmed;
        self.balance_update_applied = true;
        self.confirmed_at = Some(Utc::now());
    }

    /// Confirmed on-chain but the ledger could not apply the delta.
    pub(crate) fn mark_unreconciled(&mut self, error: String) {
        self.status = TransactionStatus::Confirmed;
        self.balance_update_applied = false;
        self.reconciliation_required = true;
        self.error = Some(error);
        self.confirmed_at = Some(Utc::now());
    }

    pub(crate) fn mark_failed(&mut self, error: String) {
        self.status = TransactionStatus::Failed;
        self.balance_update_applied = false;
        self.error = Some(error);
        self.failed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fee_snapshot_total_is_sum_of_components() {
        let fees = FeeSnapshot::new(dec!(0.09), dec!(0.50), dec!(1.00), dec!(0.75));
        assert_eq!(fees.total(), dec!(2.34));
        assert_eq!(FeeSnapshot::flat(dec!(1)).total(), dec!(1));
    }

    #[test]
    fn parses_known_kinds_case_insensitively() {
        assert_eq!("ADD".parse::<TransactionKind>().ok(), Some(TransactionKind::Add));
        assert!(matches!(
            "stake".parse::<TransactionKind>(),
            Err(ValidationError::UnknownTransactionType { .. })
        ));
    }

    #[test]
    fn category_is_derived_from_kind() {
        assert_eq!(TransactionKind::Buy.category(), TransactionCategory::Investment);
        assert_eq!(TransactionKind::Withdraw.category(), TransactionCategory::Banking);
        assert_eq!(TransactionKind::Send.category(), TransactionCategory::Transfer);
    }

    #[test]
    fn net_amount_defaults_to_amount_minus_fees() {
        let tx = Transaction::new(UserId::new("u"), TransactionKind::Add, dec!(100), Chain::Solana)
            .with_fees(FeeSnapshot::flat(dec!(1)));
        assert_eq!(tx.net_amount(), dec!(99));

        let tx = tx.with_net_amount(dec!(95));
        assert_eq!(tx.net_amount(), dec!(95));
    }

    #[test]
    fn external_buy_does_not_debit_available() {
        let tx = Transaction::new(UserId::new("u"), TransactionKind::Buy, dec!(10), Chain::Bitcoin)
            .with_payment_source(PaymentSource::External(PaymentMethod::Card));
        assert!(!tx.debits_available());

        let tx = tx.with_payment_source(PaymentSource::Wallet);
        assert!(tx.debits_available());
    }

    #[test]
    fn failure_clears_applied_flag() {
        let mut tx = Transaction::new(UserId::new("u"), TransactionKind::Send, dec!(10), Chain::Solana);
        tx.mark_failed("boom".into());
        assert_eq!(tx.status(), TransactionStatus::Failed);
        assert!(!tx.balance_update_applied());
        assert!(tx.failed_at().is_some());
    }
}
