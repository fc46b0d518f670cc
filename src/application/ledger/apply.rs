//! Balance deltas per transaction type.
//!
//! Everything here works on a scratch copy of the balance; the caller only
//! commits the copy when every step succeeded.

use rust_decimal::Decimal;

use crate::domain::error::ValidationError;
use crate::domain::{AssetHolding, Balance, Chain, FeeSchedule, Transaction, TransactionKind, Usd};
use crate::error::{Error, Result};

/// Reject amounts the ledger must never apply.
pub(crate) fn validate(tx: &Transaction, fees: &FeeSchedule) -> Result<()> {
    let amount = tx.amount();
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount { amount }.into());
    }
    let minimum = fees.min_amount(tx.kind());
    if amount < minimum {
        return Err(ValidationError::BelowMinimum {
            kind: tx.kind(),
            amount,
            minimum,
        }
        .into());
    }
    let maximum = fees.max_amount();
    if amount > maximum {
        return Err(ValidationError::AboveMaximum { amount, maximum }.into());
    }
    if tx.net_amount() < Decimal::ZERO {
        return Err(ValidationError::FeesExceedAmount {
            amount,
            fees: tx.fees().total(),
        }
        .into());
    }
    Ok(())
}

/// Apply the type-specific delta of `tx` to `balance`.
///
/// Derived figures are not refreshed here; call [`Balance::recompute`]
/// afterwards. Credits are checked, and the figures `recompute` derives are
/// checked to stay representable, so a huge amount fails with
/// [`Error::BalanceOverflow`] instead of aborting the caller.
pub(crate) fn apply(balance: &mut Balance, tx: &Transaction) -> Result<()> {
    let amount = tx.amount();
    let net = tx.net_amount();
    let overflow = || Error::BalanceOverflow {
        user_id: tx.user_id().clone(),
    };

    match tx.kind() {
        TransactionKind::Add | TransactionKind::Receive => {
            credit_stable(balance, tx.chain(), net).ok_or_else(overflow)?;
        }
        TransactionKind::Withdraw | TransactionKind::Send | TransactionKind::Transfer => {
            debit_available(balance, tx)?;
        }
        TransactionKind::Buy => {
            let trade = tx.asset().ok_or(ValidationError::MissingAssetLeg {
                kind: TransactionKind::Buy,
            })?;
            if tx.debits_available() {
                debit_available(balance, tx)?;
            }
            let units = units_for(net, trade.price).ok_or_else(overflow)?;
            let holding = balance
                .assets
                .entry(trade.symbol.clone())
                .or_insert_with(|| AssetHolding {
                    chain: tx.chain(),
                    amount: Decimal::ZERO,
                    invested_amount: Decimal::ZERO,
                    usd_value: Decimal::ZERO,
                });
            holding.amount = holding.amount.checked_add(units).ok_or_else(overflow)?;
            holding.invested_amount = holding.invested_amount.checked_add(net).ok_or_else(overflow)?;
            holding.usd_value = holding.usd_value.checked_add(net).ok_or_else(overflow)?;
        }
        TransactionKind::Sell => {
            let trade = tx.asset().ok_or(ValidationError::MissingAssetLeg {
                kind: TransactionKind::Sell,
            })?;
            let holding = balance.assets.get_mut(&trade.symbol);
            let held = holding.as_ref().map_or(Decimal::ZERO, |h| h.usd_value);
            let Some(holding) = holding.filter(|h| h.usd_value >= amount) else {
                return Err(Error::InsufficientFunds {
                    required: amount,
                    available: held,
                });
            };
            let chain = holding.chain;
            let units = units_for(amount, trade.price).ok_or_else(overflow)?;
            holding.usd_value -= amount;
            holding.invested_amount = (holding.invested_amount - amount).max(Decimal::ZERO);
            holding.amount = (holding.amount - units).max(Decimal::ZERO);
            if holding.invested_amount.is_zero() {
                balance.assets.remove(&trade.symbol);
            }
            credit_stable(balance, chain, net).ok_or_else(overflow)?;
        }
        TransactionKind::Invest => {
            debit_available(balance, tx)?;
            balance.strategy_balance = balance
                .strategy_balance
                .checked_add(net)
                .ok_or_else(overflow)?;
        }
    }

    checked_total(balance).ok_or_else(overflow)?;
    Ok(())
}

fn units_for(value: Usd, price: Usd) -> Option<Decimal> {
    if price > Decimal::ZERO {
        value.checked_div(price)
    } else {
        Some(Decimal::ZERO)
    }
}

fn credit_stable(balance: &mut Balance, chain: Chain, amount: Usd) -> Option<()> {
    let entry = balance.breakdown.entry(chain).or_default();
    entry.stable_amount = entry.stable_amount.checked_add(amount)?;
    Some(())
}

/// Grand total over stable funds, asset values and the strategy balance.
/// Every component is non-negative, so when this fits, every partial sum
/// `recompute` forms fits too.
fn checked_total(balance: &Balance) -> Option<Usd> {
    let stable = balance
        .breakdown
        .values()
        .try_fold(Decimal::ZERO, |acc, c| acc.checked_add(c.stable_amount))?;
    let assets = balance
        .assets
        .values()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.usd_value))?;
    stable.checked_add(assets)?.checked_add(balance.strategy_balance)
}

/// Draw `tx.amount()` from stable holdings.
///
/// An executed route dictates the per-chain split; any remainder, or the
/// whole amount without a route, is drawn from the transaction's chain first
/// and then from the other chains in declaration order.
fn debit_available(balance: &mut Balance, tx: &Transaction) -> Result<()> {
    let amount = tx.amount();
    let available: Usd = balance.breakdown.values().map(|c| c.stable_amount).sum();
    if available < amount {
        return Err(Error::InsufficientFunds {
            required: amount,
            available,
        });
    }

    let mut remaining = amount;
    if let Some(route) = tx.route() {
        for debit in &route.debits {
            let take = debit.amount.min(remaining);
            let entry = balance.breakdown.entry(debit.chain).or_default();
            if entry.stable_amount < take {
                return Err(Error::InsufficientFunds {
                    required: take,
                    available: entry.stable_amount,
                });
            }
            entry.stable_amount -= take;
            remaining -= take;
        }
    }

    let others = Chain::ALL.into_iter().filter(|c| *c != tx.chain());
    for chain in std::iter::once(tx.chain()).chain(others) {
        if remaining.is_zero() {
            break;
        }
        let entry = balance.breakdown.entry(chain).or_default();
        let take = entry.stable_amount.min(remaining);
        entry.stable_amount -= take;
        remaining -= take;
    }
    Ok(())
}
