//! Fee table, network fee and routing configuration.
//!
//! Entries given in the file override the built-in table one by one; types
//! and chains left out keep their defaults.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::application::router::RoutingSettings;
use crate::domain::{Chain, FeeSchedule, KindFees, RoutingFees, TransactionKind, Usd};
use crate::error::{ConfigError, Result};

/// One `[fees.<type>]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindFeeConfig {
    /// Platform fee as a fraction of the amount.
    #[serde(default)]
    pub diboas_rate: Decimal,
    /// Payment-provider fee as a fraction of the amount.
    #[serde(default)]
    pub provider_rate: Decimal,
    #[serde(default)]
    pub provider_cap: Usd,
    #[serde(default)]
    pub min_amount: Usd,
}

impl KindFeeConfig {
    const fn new(diboas_rate: Decimal, provider_rate: Decimal, provider_cap: Usd, min_amount: Usd) -> Self {
        Self {
            diboas_rate,
            provider_rate,
            provider_cap,
            min_amount,
        }
    }

    fn validate(&self) -> Result<()> {
        check_rate("fees.diboas_rate", self.diboas_rate)?;
        check_rate("fees.provider_rate", self.provider_rate)?;
        check_non_negative("fees.provider_cap", self.provider_cap)?;
        check_non_negative("fees.min_amount", self.min_amount)
    }
}

impl From<KindFeeConfig> for KindFees {
    fn from(config: KindFeeConfig) -> Self {
        KindFees {
            diboas_rate: config.diboas_rate,
            provider_rate: config.provider_rate,
            provider_cap: config.provider_cap,
            min_amount: config.min_amount,
        }
    }
}

/// Built-in per-type fee table.
#[must_use]
pub fn default_kind_fees() -> BTreeMap<TransactionKind, KindFeeConfig> {
    BTreeMap::from([
        (TransactionKind::Add, KindFeeConfig::new(dec!(0.0009), dec!(0.01), dec!(10), dec!(10))),
        (TransactionKind::Withdraw, KindFeeConfig::new(dec!(0.009), dec!(0.02), dec!(25), dec!(5))),
        (TransactionKind::Send, KindFeeConfig::new(dec!(0.0009), Decimal::ZERO, Decimal::ZERO, dec!(5))),
        (TransactionKind::Receive, KindFeeConfig::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, dec!(1))),
        (TransactionKind::Transfer, KindFeeConfig::new(dec!(0.009), Decimal::ZERO, Decimal::ZERO, dec!(5))),
        (TransactionKind::Buy, KindFeeConfig::new(dec!(0.0009), dec!(0.01), dec!(10), dec!(10))),
        (TransactionKind::Sell, KindFeeConfig::new(dec!(0.0009), Decimal::ZERO, Decimal::ZERO, dec!(10))),
        (TransactionKind::Invest, KindFeeConfig::new(dec!(0.0009), Decimal::ZERO, Decimal::ZERO, dec!(10))),
    ])
}

/// One `[networks.<chain>]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Flat fee charged when a transaction touches the chain.
    pub fee: Usd,
}

/// Built-in network fees.
#[must_use]
pub fn default_networks() -> BTreeMap<Chain, NetworkConfig> {
    BTreeMap::from([
        (Chain::Bitcoin, NetworkConfig { fee: dec!(2.50) }),
        (Chain::Ethereum, NetworkConfig { fee: dec!(1.50) }),
        (Chain::Solana, NetworkConfig { fee: dec!(0.01) }),
        (Chain::Sui, NetworkConfig { fee: dec!(0.02) }),
    ])
}

/// `[routing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Chain credited by add and receive.
    #[serde(default = "default_chain")]
    pub default_chain: Chain,
    #[serde(default = "default_bridge_base_fee")]
    pub bridge_base_fee: Usd,
    #[serde(default = "default_bridge_rate")]
    pub bridge_rate: Decimal,
    #[serde(default = "default_slippage_rate")]
    pub slippage_rate: Decimal,
}

const fn default_chain() -> Chain {
    Chain::Solana
}

fn default_bridge_base_fee() -> Usd {
    dec!(1.00)
}

fn default_bridge_rate() -> Decimal {
    dec!(0.001)
}

fn default_slippage_rate() -> Decimal {
    dec!(0.005)
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_chain: default_chain(),
            bridge_base_fee: default_bridge_base_fee(),
            bridge_rate: default_bridge_rate(),
            slippage_rate: default_slippage_rate(),
        }
    }
}

impl RoutingConfig {
    #[must_use]
    pub fn settings(&self) -> RoutingSettings {
        RoutingSettings {
            default_chain: self.default_chain,
        }
    }

    #[must_use]
    pub fn fees(&self) -> RoutingFees {
        RoutingFees {
            bridge_base_fee: self.bridge_base_fee,
            bridge_rate: self.bridge_rate,
            slippage_rate: self.slippage_rate,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_non_negative("routing.bridge_base_fee", self.bridge_base_fee)?;
        check_rate("routing.bridge_rate", self.bridge_rate)?;
        check_rate("routing.slippage_rate", self.slippage_rate)
    }
}

/// Overlay `overrides` on the built-in tables and build the schedule.
#[must_use]
pub fn fee_schedule(
    overrides: &BTreeMap<TransactionKind, KindFeeConfig>,
    networks: &BTreeMap<Chain, NetworkConfig>,
    routing: &RoutingConfig,
) -> FeeSchedule {
    let mut kinds = default_kind_fees();
    kinds.extend(overrides.iter().map(|(kind, fees)| (*kind, *fees)));
    let mut network_fees = default_networks();
    network_fees.extend(networks.iter().map(|(chain, net)| (*chain, *net)));

    FeeSchedule::new(
        kinds.into_iter().map(|(kind, fees)| (kind, fees.into())).collect(),
        network_fees
            .into_iter()
            .map(|(chain, net)| (chain, net.fee))
            .collect(),
        routing.fees(),
    )
}

pub(crate) fn validate_tables(
    kinds: &BTreeMap<TransactionKind, KindFeeConfig>,
    networks: &BTreeMap<Chain, NetworkConfig>,
) -> Result<()> {
    for fees in kinds.values() {
        fees.validate()?;
    }
    for network in networks.values() {
        check_non_negative("networks.fee", network.fee)?;
    }
    Ok(())
}

fn check_rate(field: &'static str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value >= Decimal::ONE {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be in [0, 1), got {value}"),
        }
        .into());
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be 0 or greater, got {value}"),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_single_types() {
        let overrides = BTreeMap::from([(
            TransactionKind::Add,
            KindFeeConfig::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, dec!(1)),
        )]);
        let schedule = fee_schedule(&overrides, &BTreeMap::new(), &RoutingConfig::default());

        assert_eq!(schedule.min_amount(TransactionKind::Add), dec!(1));
        assert_eq!(schedule.min_amount(TransactionKind::Withdraw), dec!(5));
        assert_eq!(schedule.network_fee(Chain::Bitcoin), dec!(2.50));
    }

    #[test]
    fn rates_of_one_or_more_are_rejected() {
        let kinds = BTreeMap::from([(
            TransactionKind::Buy,
            KindFeeConfig::new(Decimal::ONE, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        )]);
        assert!(validate_tables(&kinds, &BTreeMap::new()).is_err());
    }
}
