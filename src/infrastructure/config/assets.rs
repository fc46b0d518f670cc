//! Tradable asset configuration.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::{AssetCatalog, AssetInfo, AssetSymbol, Chain, Usd};
use crate::error::{ConfigError, Result};

/// One `[assets.<symbol>]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub chain: Chain,
    pub reference_price: Usd,
    #[serde(default = "default_tradable")]
    pub tradable: bool,
}

const fn default_tradable() -> bool {
    true
}

/// Built-in catalog.
#[must_use]
pub fn default_assets() -> BTreeMap<String, AssetConfig> {
    let asset = |chain, reference_price| AssetConfig {
        chain,
        reference_price,
        tradable: true,
    };
    BTreeMap::from([
        ("BTC".to_string(), asset(Chain::Bitcoin, dec!(60000))),
        ("ETH".to_string(), asset(Chain::Ethereum, dec!(3000))),
        ("SOL".to_string(), asset(Chain::Solana, dec!(150))),
        ("SUI".to_string(), asset(Chain::Sui, dec!(2))),
        ("PAXG".to_string(), asset(Chain::Ethereum, dec!(2400))),
    ])
}

/// Overlay `overrides` on the built-in catalog.
#[must_use]
pub fn asset_catalog(overrides: &BTreeMap<String, AssetConfig>) -> AssetCatalog {
    let mut assets = default_assets();
    assets.extend(overrides.iter().map(|(s, c)| (s.clone(), c.clone())));
    AssetCatalog::new(
        assets
            .into_iter()
            .map(|(symbol, config)| {
                (
                    AssetSymbol::new(symbol),
                    AssetInfo {
                        chain: config.chain,
                        reference_price: config.reference_price,
                        tradable: config.tradable,
                    },
                )
            })
            .collect(),
    )
}

pub(crate) fn validate_assets(assets: &BTreeMap<String, AssetConfig>) -> Result<()> {
    for (symbol, config) in assets {
        if AssetSymbol::new(symbol).is_stablecoin() {
            return Err(ConfigError::InvalidValue {
                field: "assets",
                reason: format!("{symbol} is a stablecoin and cannot be listed as an asset"),
            }
            .into());
        }
        if config.reference_price <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "assets.reference_price",
                reason: format!("{symbol}: must be greater than 0"),
            }
            .into());
        }
    }
    Ok(())
}
