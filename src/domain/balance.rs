//! Per-user balance state and its accounting invariants.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AssetSymbol, Chain, Usd, UserId};

/// Holdings on a single chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainBalance {
    /// Units of the chain's native asset.
    pub native_amount: Decimal,
    /// USD-pegged stablecoin balance.
    pub stable_amount: Usd,
    /// Stable balance plus the USD value of every asset held on the chain.
    pub usd_value: Usd,
}

/// A non-stable asset position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHolding {
    pub chain: Chain,
    /// Units held.
    pub amount: Decimal,
    /// USD put into the position, net of fees.
    pub invested_amount: Usd,
    /// Current USD value of the position.
    pub usd_value: Usd,
}

/// The canonical balance of one user.
///
/// Only the ledger mutates a balance; everything handed out is a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub(crate) user_id: UserId,
    pub(crate) total_usd: Usd,
    pub(crate) available_for_spending: Usd,
    pub(crate) invested_amount: Usd,
    pub(crate) strategy_balance: Usd,
    pub(crate) breakdown: BTreeMap<Chain, ChainBalance>,
    pub(crate) assets: BTreeMap<AssetSymbol, AssetHolding>,
    pub(crate) last_updated: DateTime<Utc>,
}

impl Balance {
    /// A clean, all-zero balance with an entry for every chain.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            total_usd: Decimal::ZERO,
            available_for_spending: Decimal::ZERO,
            invested_amount: Decimal::ZERO,
            strategy_balance: Decimal::ZERO,
            breakdown: Chain::ALL
                .into_iter()
                .map(|chain| (chain, ChainBalance::default()))
                .collect(),
            assets: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn total_usd(&self) -> Usd {
        self.total_usd
    }

    #[must_use]
    pub fn available_for_spending(&self) -> Usd {
        self.available_for_spending
    }

    #[must_use]
    pub fn invested_amount(&self) -> Usd {
        self.invested_amount
    }

    #[must_use]
    pub fn strategy_balance(&self) -> Usd {
        self.strategy_balance
    }

    #[must_use]
    pub fn breakdown(&self) -> &BTreeMap<Chain, ChainBalance> {
        &self.breakdown
    }

    #[must_use]
    pub fn chain(&self, chain: Chain) -> ChainBalance {
        self.breakdown.get(&chain).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn assets(&self) -> &BTreeMap<AssetSymbol, AssetHolding> {
        &self.assets
    }

    #[must_use]
    pub fn asset(&self, symbol: &AssetSymbol) -> Option<&AssetHolding> {
        self.assets.get(symbol)
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Recompute every derived figure from the per-chain and per-asset data.
    pub(crate) fn recompute(&mut self) {
        for (chain, entry) in &mut self.breakdown {
            let native = AssetSymbol::new(chain.native_symbol());
            let held_value: Usd = self
                .assets
                .values()
                .filter(|holding| holding.chain == *chain)
                .map(|holding| holding.usd_value)
                .sum();
            entry.native_amount = self
                .assets
                .get(&native)
                .map_or(Decimal::ZERO, |holding| holding.amount);
            entry.usd_value = entry.stable_amount + held_value;
        }

        self.available_for_spending = self.breakdown.values().map(|c| c.stable_amount).sum();
        self.invested_amount = self.assets.values().map(|a| a.usd_value).sum();
        self.total_usd = self.available_for_spending + self.invested_amount + self.strategy_balance;
        self.last_updated = Utc::now();
    }

    /// Check every accounting invariant, describing the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let expected_total =
            self.available_for_spending + self.invested_amount + self.strategy_balance;
        if self.total_usd != expected_total {
            return Err(format!(
                "total {} != available {} + invested {} + strategy {}",
                self.total_usd,
                self.available_for_spending,
                self.invested_amount,
                self.strategy_balance
            ));
        }
        if self.available_for_spending < Decimal::ZERO {
            return Err(format!(
                "available balance is negative: {}",
                self.available_for_spending
            ));
        }
        if self.invested_amount < Decimal::ZERO {
            return Err(format!("invested amount is negative: {}", self.invested_amount));
        }
        if self.strategy_balance < Decimal::ZERO {
            return Err(format!("strategy balance is negative: {}", self.strategy_balance));
        }
        for (chain, entry) in &self.breakdown {
            if entry.stable_amount < Decimal::ZERO {
                return Err(format!("stable balance on {chain} is negative"));
            }
        }
        let stable_sum: Usd = self.breakdown.values().map(|c| c.stable_amount).sum();
        if stable_sum != self.available_for_spending {
            return Err(format!(
                "available {} does not match per-chain stable sum {}",
                self.available_for_spending, stable_sum
            ));
        }
        for (symbol, holding) in &self.assets {
            if holding.invested_amount < Decimal::ZERO || holding.amount < Decimal::ZERO {
                return Err(format!("holding {symbol} is negative"));
            }
        }
        Ok(())
    }
}
