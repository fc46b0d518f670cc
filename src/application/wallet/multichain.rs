//! Unified balance views and single-source routing.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ledger::BalanceLedger;
use crate::domain::{
    AssetCatalog, AssetSymbol, Chain, ChainBalance, ChainDebit, FeeSchedule, RouteExecution,
    RoutingPlan, RoutingStep, StepKind, Usd, UserId,
};
use crate::error::{Error, Result};

/// Aggregated view of a user's holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedBalance {
    /// Sum of stable holdings on every chain.
    pub available: Usd,
    /// USD value of every non-stable asset.
    pub invested: Usd,
    pub strategy: Usd,
    pub total: Usd,
    pub chains: BTreeMap<Chain, ChainBalance>,
}

pub struct MultiChainWallet {
    ledger: Arc<BalanceLedger>,
    fees: Arc<FeeSchedule>,
    assets: Arc<AssetCatalog>,
}

impl MultiChainWallet {
    #[must_use]
    pub fn new(ledger: Arc<BalanceLedger>, fees: Arc<FeeSchedule>, assets: Arc<AssetCatalog>) -> Self {
        Self {
            ledger,
            fees,
            assets,
        }
    }

    pub fn get_unified_balance(&self, user_id: &UserId) -> Result<UnifiedBalance> {
        let balance = self.ledger.get_balance(user_id)?;
        let available: Usd = balance.breakdown().values().map(|c| c.stable_amount).sum();
        let invested: Usd = balance
            .assets()
            .iter()
            .filter(|(symbol, _)| !symbol.is_stablecoin())
            .map(|(_, holding)| holding.usd_value)
            .sum();
        Ok(UnifiedBalance {
            available,
            invested,
            strategy: balance.strategy_balance(),
            total: available + invested + balance.strategy_balance(),
            chains: balance.breakdown().clone(),
        })
    }

    /// Estimated cost of moving `amount` from one chain to another.
    #[must_use]
    pub fn estimate_routing_fees(&self, from: Chain, to: Chain, amount: Usd) -> Usd {
        self.fees.routing_fee(from, to, amount)
    }

    /// Every single-source plan that can deliver `amount` of value to
    /// `to_chain` out of `from_asset`, cheapest first.
    ///
    /// A source qualifies when its unreserved balance, less the routing
    /// cost, still covers `amount`. Ties keep chain declaration order. An
    /// empty result means the request is infeasible.
    pub fn find_routing_options(
        &self,
        user_id: &UserId,
        amount: Usd,
        from_asset: &AssetSymbol,
        to_chain: Chain,
    ) -> Result<Vec<RoutingPlan>> {
        let mut options = Vec::new();

        if from_asset.is_stablecoin() {
            for (chain, free) in self.ledger.spendable_by_chain(user_id)? {
                let cost = self.estimate_routing_fees(chain, to_chain, amount);
                if free - cost < amount {
                    continue;
                }
                let steps = if chain == to_chain {
                    Vec::new()
                } else {
                    vec![RoutingStep {
                        kind: StepKind::Bridge,
                        from_chain: chain,
                        to_chain,
                        asset: from_asset.clone(),
                        amount,
                        estimated_fee: cost,
                    }]
                };
                options.push(RoutingPlan {
                    from_chain: chain,
                    to_chain,
                    asset: from_asset.clone(),
                    amount,
                    estimated_cost: cost,
                    steps,
                });
            }
        } else if let Some(info) = self.assets.get(from_asset) {
            let home = info.chain;
            let free = self.ledger.spendable_asset(user_id, from_asset)?;
            let cost = self.estimate_routing_fees(home, to_chain, amount);
            if free - cost >= amount {
                let mut steps = vec![RoutingStep {
                    kind: StepKind::Swap,
                    from_chain: home,
                    to_chain: home,
                    asset: from_asset.clone(),
                    amount,
                    estimated_fee: Decimal::ZERO,
                }];
                if home != to_chain {
                    steps.push(RoutingStep {
                        kind: StepKind::Bridge,
                        from_chain: home,
                        to_chain,
                        asset: AssetSymbol::usdc(),
                        amount,
                        estimated_fee: cost,
                    });
                }
                options.push(RoutingPlan {
                    from_chain: home,
                    to_chain,
                    asset: from_asset.clone(),
                    amount,
                    estimated_cost: cost,
                    steps,
                });
            }
        }

        options.sort_by(|a, b| a.estimated_cost.cmp(&b.estimated_cost));
        debug!(
            user_id = %user_id,
            amount = %amount,
            asset = %from_asset,
            to_chain = %to_chain,
            options = options.len(),
            "Routing options computed"
        );
        Ok(options)
    }

    /// Validate every step of `plan` against a copy of the user's funds.
    ///
    /// All steps must succeed for a [`RouteExecution`] to be returned; the
    /// first failing step aborts with [`Error::RoutingAborted`] and nothing is
    /// committed either way.
    pub fn execute_routing(&self, user_id: &UserId, plan: &RoutingPlan) -> Result<RouteExecution> {
        let mut stable: BTreeMap<Chain, Usd> =
            self.ledger.spendable_by_chain(user_id)?.into_iter().collect();
        let mut asset_free = if plan.asset.is_stablecoin() {
            Decimal::ZERO
        } else {
            self.ledger.spendable_asset(user_id, &plan.asset)?
        };

        let abort = |step: usize, reason: String| Error::RoutingAborted { step, reason };

        if plan.steps.is_empty() {
            if plan.is_cross_chain() {
                return Err(abort(0, "cross-chain plan has no steps".into()));
            }
            let free = stable.get(&plan.from_chain).copied().unwrap_or_default();
            if free < plan.amount {
                return Err(Error::InsufficientFunds {
                    required: plan.amount,
                    available: free,
                });
            }
        }

        let mut at = plan.from_chain;
        for (index, step) in plan.steps.iter().enumerate() {
            if step.from_chain != at {
                return Err(abort(
                    index,
                    format!("step starts on {} but value is on {at}", step.from_chain),
                ));
            }
            match step.kind {
                StepKind::Swap => {
                    if step.from_chain != step.to_chain {
                        return Err(abort(index, "swap must stay on one chain".into()));
                    }
                    if asset_free < step.amount {
                        return Err(abort(
                            index,
                            format!("{} holding {asset_free} below {}", step.asset, step.amount),
                        ));
                    }
                    asset_free -= step.amount;
                    *stable.entry(step.to_chain).or_default() += step.amount;
                }
                StepKind::Bridge => {
                    if step.from_chain == step.to_chain {
                        return Err(abort(index, "bridge must change chain".into()));
                    }
                    let needed = step.amount + step.estimated_fee;
                    let source = stable.entry(step.from_chain).or_default();
                    if *source < needed {
                        return Err(abort(
                            index,
                            format!("{} balance {source} below {needed}", step.from_chain),
                        ));
                    }
                    *source -= needed;
                    *stable.entry(step.to_chain).or_default() += step.amount;
                }
            }
            at = step.to_chain;
        }
        if at != plan.to_chain {
            return Err(abort(
                plan.steps.len(),
                format!("route ends on {at}, expected {}", plan.to_chain),
            ));
        }

        let debits = if plan.asset.is_stablecoin() {
            vec![ChainDebit {
                chain: plan.from_chain,
                amount: plan.amount,
            }]
        } else {
            Vec::new()
        };
        let routing_fee: Usd = plan.steps.iter().map(|s| s.estimated_fee).sum();

        debug!(
            user_id = %user_id,
            from = %plan.from_chain,
            to = %plan.to_chain,
            steps = plan.steps.len(),
            routing_fee = %routing_fee,
            "Routing validated"
        );
        Ok(RouteExecution {
            from_chain: plan.from_chain,
            to_chain: plan.to_chain,
            debits,
            routing_fee,
            steps_applied: plan.steps.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ledger::{LedgerSettings, ReservationKey};
    use crate::domain::{AssetInfo, FeeSnapshot, RoutingFees, Transaction, TransactionKind};
    use rust_decimal_macros::dec;

    fn wallet() -> (MultiChainWallet, Arc<BalanceLedger>) {
        let mut networks = BTreeMap::new();
        networks.insert(Chain::Bitcoin, dec!(1.50));
        networks.insert(Chain::Ethereum, dec!(0.50));
        let fees = Arc::new(FeeSchedule::new(
            BTreeMap::new(),
            networks,
            RoutingFees {
                bridge_base_fee: dec!(0.50),
                bridge_rate: dec!(0.001),
                slippage_rate: dec!(0.0025),
            },
        ));
        let mut assets = BTreeMap::new();
        assets.insert(
            AssetSymbol::new("ETH"),
            AssetInfo {
                chain: Chain::Ethereum,
                reference_price: dec!(3000),
                tradable: true,
            },
        );
        let ledger = Arc::new(BalanceLedger::new(LedgerSettings::default(), fees.clone()));
        let wallet = MultiChainWallet::new(ledger.clone(), fees, Arc::new(AssetCatalog::new(assets)));
        (wallet, ledger)
    }

    fn fund(ledger: &BalanceLedger, user: &UserId, chain: Chain, amount: Usd) {
        let tx = Transaction::new(user.clone(), TransactionKind::Receive, amount, chain)
            .with_fees(FeeSnapshot::zero());
        ledger.update_balance(&tx).unwrap();
    }

    #[test]
    fn unified_balance_splits_stable_and_invested() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        fund(&ledger, &user, Chain::Solana, dec!(200));
        let buy = Transaction::new(user.clone(), TransactionKind::Buy, dec!(100), Chain::Ethereum)
            .with_asset(AssetSymbol::new("ETH"), dec!(3000))
            .with_fees(FeeSnapshot::flat(dec!(2)));
        ledger.update_balance(&buy).unwrap();

        let unified = wallet.get_unified_balance(&user).unwrap();
        assert_eq!(unified.available, dec!(100));
        assert_eq!(unified.invested, dec!(98));
        assert_eq!(unified.total, dec!(198));
    }

    #[test]
    fn same_chain_option_is_free_and_first() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        fund(&ledger, &user, Chain::Ethereum, dec!(500));
        fund(&ledger, &user, Chain::Solana, dec!(500));

        let options = wallet
            .find_routing_options(&user, dec!(100), &AssetSymbol::usdc(), Chain::Solana)
            .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].from_chain, Chain::Solana);
        assert_eq!(options[0].estimated_cost, Decimal::ZERO);
        assert!(options[0].steps.is_empty());
        assert_eq!(options[1].from_chain, Chain::Ethereum);
        assert_eq!(options[1].steps.len(), 1);
    }

    #[test]
    fn ties_keep_declaration_order() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        // Bitcoin and Ethereum cost the same to reach Sui.
        fund(&ledger, &user, Chain::Ethereum, dec!(500));
        fund(&ledger, &user, Chain::Bitcoin, dec!(500));

        let options = wallet
            .find_routing_options(&user, dec!(100), &AssetSymbol::usdc(), Chain::Sui)
            .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].estimated_cost, options[1].estimated_cost);
        assert_eq!(options[0].from_chain, Chain::Bitcoin);
        assert_eq!(options[1].from_chain, Chain::Ethereum);
    }

    #[test]
    fn options_exclude_chains_that_cannot_cover_cost() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        fund(&ledger, &user, Chain::Ethereum, dec!(100));

        let options = wallet
            .find_routing_options(&user, dec!(100), &AssetSymbol::usdc(), Chain::Solana)
            .unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn reservations_shrink_options() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        fund(&ledger, &user, Chain::Solana, dec!(100));
        let _hold = ledger
            .reserve(&user, vec![(ReservationKey::Stable(Chain::Solana), dec!(60))])
            .unwrap();

        let options = wallet
            .find_routing_options(&user, dec!(50), &AssetSymbol::usdc(), Chain::Solana)
            .unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn execute_routing_returns_debits_without_mutating() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        fund(&ledger, &user, Chain::Ethereum, dec!(500));
        let before = ledger.get_balance(&user).unwrap();

        let plan = wallet
            .find_routing_options(&user, dec!(100), &AssetSymbol::usdc(), Chain::Solana)
            .unwrap()
            .remove(0);
        let execution = wallet.execute_routing(&user, &plan).unwrap();
        assert_eq!(execution.debits, vec![ChainDebit { chain: Chain::Ethereum, amount: dec!(100) }]);
        assert_eq!(execution.routing_fee, plan.estimated_cost);
        assert_eq!(execution.steps_applied, 1);
        assert_eq!(ledger.get_balance(&user).unwrap(), before);
    }

    #[test]
    fn broken_plan_aborts_at_failing_step() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        fund(&ledger, &user, Chain::Ethereum, dec!(500));

        let plan = RoutingPlan {
            from_chain: Chain::Ethereum,
            to_chain: Chain::Sui,
            asset: AssetSymbol::usdc(),
            amount: dec!(100),
            estimated_cost: dec!(1),
            steps: vec![
                RoutingStep {
                    kind: StepKind::Bridge,
                    from_chain: Chain::Ethereum,
                    to_chain: Chain::Solana,
                    asset: AssetSymbol::usdc(),
                    amount: dec!(100),
                    estimated_fee: dec!(1),
                },
                RoutingStep {
                    kind: StepKind::Bridge,
                    from_chain: Chain::Bitcoin,
                    to_chain: Chain::Sui,
                    asset: AssetSymbol::usdc(),
                    amount: dec!(100),
                    estimated_fee: dec!(1),
                },
            ],
        };
        assert!(matches!(
            wallet.execute_routing(&user, &plan),
            Err(Error::RoutingAborted { step: 1, .. })
        ));
    }

    #[test]
    fn asset_source_plans_swap_then_bridge() {
        let (wallet, ledger) = wallet();
        let user = UserId::new("u");
        ledger.open_session(&user).unwrap();
        fund(&ledger, &user, Chain::Ethereum, dec!(1000));
        let buy = Transaction::new(user.clone(), TransactionKind::Buy, dec!(500), Chain::Ethereum)
            .with_asset(AssetSymbol::new("ETH"), dec!(3000));
        ledger.update_balance(&buy).unwrap();

        let options = wallet
            .find_routing_options(&user, dec!(100), &AssetSymbol::new("ETH"), Chain::Solana)
            .unwrap();
        assert_eq!(options.len(), 1);
        let kinds: Vec<StepKind> = options[0].steps.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![StepKind::Swap, StepKind::Bridge]);

        let execution = wallet.execute_routing(&user, &options[0]).unwrap();
        assert!(execution.debits.is_empty());
        assert_eq!(execution.steps_applied, 2);
    }
}
