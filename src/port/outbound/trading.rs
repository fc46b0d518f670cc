//! Trading and investment provider port.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{AssetSymbol, Usd};
use crate::error::ProviderError;

/// Executed trade as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub id: String,
    /// Units bought or sold.
    pub quantity: Decimal,
    /// Execution price per unit in USD.
    pub price: Usd,
}

/// Executes asset trades.
#[async_trait]
pub trait TradingProvider: Send + Sync {
    /// Buy `amount` USD worth of `asset`.
    async fn buy_asset(&self, asset: &AssetSymbol, amount: Usd)
        -> Result<TradeReceipt, ProviderError>;

    /// Sell `amount` USD worth of `asset`.
    async fn sell_asset(
        &self,
        asset: &AssetSymbol,
        amount: Usd,
    ) -> Result<TradeReceipt, ProviderError>;

    /// Allocate `amount` USD into a managed strategy on `asset`.
    async fn purchase_asset(
        &self,
        asset: &AssetSymbol,
        amount: Usd,
    ) -> Result<TradeReceipt, ProviderError>;
}
