//! Cross-chain routing plans.

use serde::{Deserialize, Serialize};

use super::{AssetSymbol, Chain, Usd};

/// Kind of a single routing hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Convert an asset into the routing stablecoin on the same chain.
    Swap,
    /// Move the stablecoin from one chain to another.
    Bridge,
}

/// One ordered step of a routing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingStep {
    pub kind: StepKind,
    pub from_chain: Chain,
    pub to_chain: Chain,
    /// Asset consumed by this step.
    pub asset: AssetSymbol,
    /// USD value consumed by this step.
    pub amount: Usd,
    pub estimated_fee: Usd,
}

/// A candidate way of funding `amount` on `to_chain` from `from_chain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingPlan {
    pub from_chain: Chain,
    pub to_chain: Chain,
    /// Asset the value is drawn from.
    pub asset: AssetSymbol,
    pub amount: Usd,
    /// Sum of the estimated fees of every step.
    pub estimated_cost: Usd,
    /// Ordered steps; empty for a same-chain stablecoin plan.
    pub steps: Vec<RoutingStep>,
}

impl RoutingPlan {
    #[must_use]
    pub fn is_cross_chain(&self) -> bool {
        self.from_chain != self.to_chain
    }
}

/// Per-chain amount drawn from a user's stable holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDebit {
    pub chain: Chain,
    pub amount: Usd,
}

/// Outcome of a fully validated routing plan.
///
/// Nothing is committed when the plan is executed; the debits are folded
/// into the balance update once the owning transaction is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteExecution {
    pub from_chain: Chain,
    pub to_chain: Chain,
    pub debits: Vec<ChainDebit>,
    pub routing_fee: Usd,
    pub steps_applied: usize,
}

impl RouteExecution {
    #[must_use]
    pub fn is_cross_chain(&self) -> bool {
        self.from_chain != self.to_chain
    }

    /// Total drawn across every debited chain.
    #[must_use]
    pub fn total_debit(&self) -> Usd {
        self.debits.iter().map(|d| d.amount).sum()
    }
}
