//! Fee schedule and fee computation.
//!
//! The schedule is built once from configuration and shared immutably; fees
//! are computed from it at planning time and frozen into a [`FeeSnapshot`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::money::round_cents;
use super::{Chain, FeeSnapshot, TransactionKind, Usd};

/// Fee parameters for one transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindFees {
    /// Platform fee as a fraction of the amount.
    pub diboas_rate: Decimal,
    /// Payment-provider fee as a fraction of the amount.
    pub provider_rate: Decimal,
    /// Upper bound on the provider fee.
    pub provider_cap: Usd,
    /// Smallest accepted amount.
    pub min_amount: Usd,
}

/// Bridge cost parameters for cross-chain routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingFees {
    pub bridge_base_fee: Usd,
    pub bridge_rate: Decimal,
    pub slippage_rate: Decimal,
}

/// Inputs to a fee quote.
#[derive(Debug, Clone, Copy)]
pub struct FeeQuote<'a> {
    pub kind: TransactionKind,
    pub amount: Usd,
    /// Every chain the transaction touches.
    pub chains: &'a [Chain],
    /// Whether an off-platform payment rail is involved.
    pub uses_payment_provider: bool,
    /// Routing fee of the selected plan, zero for same-chain.
    pub routing: Usd,
}

/// Immutable fee table.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    kinds: BTreeMap<TransactionKind, KindFees>,
    networks: BTreeMap<Chain, Usd>,
    routing: RoutingFees,
    max_amount: Usd,
}

/// Largest single transaction accepted unless configured otherwise.
pub const DEFAULT_MAX_AMOUNT: Usd = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

impl FeeSchedule {
    #[must_use]
    pub fn new(
        kinds: BTreeMap<TransactionKind, KindFees>,
        networks: BTreeMap<Chain, Usd>,
        routing: RoutingFees,
    ) -> Self {
        Self {
            kinds,
            networks,
            routing,
            max_amount: DEFAULT_MAX_AMOUNT,
        }
    }

    /// Replace the per-transaction maximum.
    #[must_use]
    pub fn with_max_amount(mut self, max_amount: Usd) -> Self {
        self.max_amount = max_amount;
        self
    }

    #[must_use]
    pub fn max_amount(&self) -> Usd {
        self.max_amount
    }

    /// Fee parameters for a type; missing entries charge nothing.
    #[must_use]
    pub fn kind(&self, kind: TransactionKind) -> KindFees {
        self.kinds.get(&kind).copied().unwrap_or(KindFees {
            diboas_rate: Decimal::ZERO,
            provider_rate: Decimal::ZERO,
            provider_cap: Decimal::ZERO,
            min_amount: Decimal::ZERO,
        })
    }

    #[must_use]
    pub fn min_amount(&self, kind: TransactionKind) -> Usd {
        self.kind(kind).min_amount
    }

    #[must_use]
    pub fn routing(&self) -> RoutingFees {
        self.routing
    }

    /// Flat network fee for one chain.
    #[must_use]
    pub fn network_fee(&self, chain: Chain) -> Usd {
        self.networks.get(&chain).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn diboas_fee(&self, kind: TransactionKind, amount: Usd) -> Usd {
        round_cents(amount * self.kind(kind).diboas_rate)
    }

    /// Provider fee, capped per type.
    #[must_use]
    pub fn provider_fee(&self, kind: TransactionKind, amount: Usd) -> Usd {
        let fees = self.kind(kind);
        round_cents((amount * fees.provider_rate).min(fees.provider_cap))
    }

    /// Network fee summed over the distinct chains involved.
    #[must_use]
    pub fn network_fee_for(&self, chains: &[Chain]) -> Usd {
        let mut seen: Vec<Chain> = Vec::with_capacity(chains.len());
        for chain in chains {
            if !seen.contains(chain) {
                seen.push(*chain);
            }
        }
        round_cents(seen.into_iter().map(|c| self.network_fee(c)).sum())
    }

    /// Estimated cost of moving `amount` between chains.
    ///
    /// Zero for the same chain; otherwise bridge fee, destination network fee
    /// and slippage, strictly increasing in `amount` when any rate is positive.
    #[must_use]
    pub fn routing_fee(&self, from: Chain, to: Chain, amount: Usd) -> Usd {
        if from == to {
            return Decimal::ZERO;
        }
        let bridge = self.routing.bridge_base_fee + amount * self.routing.bridge_rate;
        let slippage = amount * self.routing.slippage_rate;
        round_cents(bridge + self.network_fee(to) + slippage)
    }

    /// Compute the full fee breakdown for a planned transaction.
    #[must_use]
    pub fn quote(&self, quote: FeeQuote<'_>) -> FeeSnapshot {
        let diboas = self.diboas_fee(quote.kind, quote.amount);
        let network = self.network_fee_for(quote.chains);
        let provider = if quote.uses_payment_provider {
            self.provider_fee(quote.kind, quote.amount)
        } else {
            Decimal::ZERO
        };
        FeeSnapshot::new(diboas, network, provider, round_cents(quote.routing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn schedule() -> FeeSchedule {
        let mut kinds = BTreeMap::new();
        kinds.insert(
            TransactionKind::Add,
            KindFees {
                diboas_rate: dec!(0.0009),
                provider_rate: dec!(0.01),
                provider_cap: dec!(5),
                min_amount: dec!(10),
            },
        );
        let mut networks = BTreeMap::new();
        networks.insert(Chain::Ethereum, dec!(0.50));
        networks.insert(Chain::Solana, dec!(0.01));
        FeeSchedule::new(
            kinds,
            networks,
            RoutingFees {
                bridge_base_fee: dec!(0.50),
                bridge_rate: dec!(0.001),
                slippage_rate: dec!(0.0025),
            },
        )
    }

    #[test]
    fn provider_fee_is_capped() {
        let schedule = schedule();
        assert_eq!(schedule.provider_fee(TransactionKind::Add, dec!(100)), dec!(1.00));
        assert_eq!(schedule.provider_fee(TransactionKind::Add, dec!(10000)), dec!(5));
    }

    #[test]
    fn network_fee_counts_each_chain_once() {
        let schedule = schedule();
        let fee = schedule.network_fee_for(&[Chain::Ethereum, Chain::Ethereum, Chain::Solana]);
        assert_eq!(fee, dec!(0.51));
    }

    #[test]
    fn routing_fee_is_zero_on_same_chain() {
        let schedule = schedule();
        assert_eq!(
            schedule.routing_fee(Chain::Solana, Chain::Solana, dec!(1000)),
            Decimal::ZERO
        );
    }

    #[test]
    fn routing_fee_grows_with_amount() {
        let schedule = schedule();
        let small = schedule.routing_fee(Chain::Solana, Chain::Ethereum, dec!(100));
        let large = schedule.routing_fee(Chain::Solana, Chain::Ethereum, dec!(1000));
        // 0.50 + 0.10 + 0.50 + 0.25
        assert_eq!(small, dec!(1.35));
        assert!(large > small);
    }

    #[test]
    fn quote_sums_components() {
        let schedule = schedule();
        let fees = schedule.quote(FeeQuote {
            kind: TransactionKind::Add,
            amount: dec!(100),
            chains: &[Chain::Solana],
            uses_payment_provider: true,
            routing: Decimal::ZERO,
        });
        assert_eq!(fees.diboas(), dec!(0.09));
        assert_eq!(fees.provider(), dec!(1.00));
        assert_eq!(fees.network(), dec!(0.01));
        assert_eq!(fees.total(), dec!(1.10));
    }

    #[test]
    fn unknown_kind_charges_nothing() {
        let schedule = schedule();
        assert_eq!(schedule.diboas_fee(TransactionKind::Sell, dec!(100)), Decimal::ZERO);
        assert_eq!(schedule.min_amount(TransactionKind::Sell), Decimal::ZERO);
    }
}
