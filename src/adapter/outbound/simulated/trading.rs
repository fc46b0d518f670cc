//! Simulated trading desk filling at fixed prices.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::script::{simulate_latency, FailureScript};
use crate::domain::{AssetCatalog, AssetSymbol, Usd};
use crate::error::{ProviderError, ProviderKind};
use crate::port::{TradeReceipt, TradingProvider};

#[derive(Debug, Default)]
pub struct SimulatedTrading {
    prices: RwLock<BTreeMap<AssetSymbol, Usd>>,
    latency: Duration,
    failures: FailureScript,
}

impl SimulatedTrading {
    /// Fill every catalog asset at its reference price.
    #[must_use]
    pub fn from_catalog(assets: &AssetCatalog) -> Self {
        let prices = assets
            .symbols()
            .filter_map(|symbol| {
                assets
                    .get(symbol)
                    .map(|info| (symbol.clone(), info.reference_price))
            })
            .collect();
        Self {
            prices: RwLock::new(prices),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_price(&self, symbol: AssetSymbol, price: Usd) {
        self.prices.write().insert(symbol, price);
    }

    pub fn fail_next(&self, error: ProviderError) {
        self.failures.push(error);
    }

    async fn fill(&self, asset: &AssetSymbol, amount: Usd) -> Result<TradeReceipt, ProviderError> {
        simulate_latency(self.latency).await;
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        let price = self
            .prices
            .read()
            .get(asset)
            .copied()
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| ProviderError::Rejected {
                provider: ProviderKind::Trading,
                reason: format!("no market for {asset}"),
            })?;
        Ok(TradeReceipt {
            id: format!("trade_{}", Uuid::new_v4().simple()),
            quantity: amount / price,
            price,
        })
    }
}

#[async_trait]
impl TradingProvider for SimulatedTrading {
    async fn buy_asset(
        &self,
        asset: &AssetSymbol,
        amount: Usd,
    ) -> Result<TradeReceipt, ProviderError> {
        self.fill(asset, amount).await
    }

    async fn sell_asset(
        &self,
        asset: &AssetSymbol,
        amount: Usd,
    ) -> Result<TradeReceipt, ProviderError> {
        self.fill(asset, amount).await
    }

    async fn purchase_asset(
        &self,
        asset: &AssetSymbol,
        amount: Usd,
    ) -> Result<TradeReceipt, ProviderError> {
        self.fill(asset, amount).await
    }
}
