//! Tradable asset catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AssetSymbol, Chain, Usd};

/// Static facts about an asset the platform can trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Chain the asset is held on.
    pub chain: Chain,
    /// Reference price in USD, used until a trading provider quotes one.
    pub reference_price: Usd,
    /// Whether the asset is on the buy/sell/invest allow-list.
    pub tradable: bool,
}

/// Allow-list and reference data for non-stable assets.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    assets: BTreeMap<AssetSymbol, AssetInfo>,
}

impl AssetCatalog {
    #[must_use]
    pub fn new(assets: BTreeMap<AssetSymbol, AssetInfo>) -> Self {
        Self { assets }
    }

    /// Look up an asset.
    #[must_use]
    pub fn get(&self, symbol: &AssetSymbol) -> Option<&AssetInfo> {
        self.assets.get(symbol)
    }

    /// Returns true if the asset may be bought, sold or invested in.
    #[must_use]
    pub fn is_allowed(&self, symbol: &AssetSymbol) -> bool {
        !symbol.is_stablecoin() && self.get(symbol).is_some_and(|info| info.tradable)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &AssetSymbol> {
        self.assets.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn catalog() -> AssetCatalog {
        let mut assets = BTreeMap::new();
        assets.insert(
            AssetSymbol::new("BTC"),
            AssetInfo {
                chain: Chain::Bitcoin,
                reference_price: dec!(65000),
                tradable: true,
            },
        );
        assets.insert(
            AssetSymbol::new("DOGE"),
            AssetInfo {
                chain: Chain::Ethereum,
                reference_price: dec!(0.1),
                tradable: false,
            },
        );
        assets.insert(
            AssetSymbol::new("USDC"),
            AssetInfo {
                chain: Chain::Solana,
                reference_price: dec!(1),
                tradable: true,
            },
        );
        AssetCatalog::new(assets)
    }

    #[test]
    fn allow_list_respects_tradable_flag() {
        let catalog = catalog();
        assert!(catalog.is_allowed(&AssetSymbol::new("btc")));
        assert!(!catalog.is_allowed(&AssetSymbol::new("DOGE")));
        assert!(!catalog.is_allowed(&AssetSymbol::new("XRP")));
    }

    #[test]
    fn stablecoins_are_never_tradable_assets() {
        assert!(!catalog().is_allowed(&AssetSymbol::usdc()));
    }
}
