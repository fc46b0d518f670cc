//! The full set of simulated providers.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::AssetCatalog;
use crate::port::Providers;

use super::{SimulatedChain, SimulatedKyc, SimulatedPayment, SimulatedTrading};

/// Simulated providers, kept as concrete types so callers can script them.
#[derive(Clone)]
pub struct SimulatedProviders {
    pub payment: Arc<SimulatedPayment>,
    pub chain: Arc<SimulatedChain>,
    pub kyc: Arc<SimulatedKyc>,
    pub trading: Arc<SimulatedTrading>,
}

impl SimulatedProviders {
    /// Providers that succeed immediately, with prices from `assets`.
    #[must_use]
    pub fn new(assets: &AssetCatalog) -> Self {
        Self::with_latency(assets, Duration::ZERO)
    }

    /// Providers that wait `latency` on every call.
    #[must_use]
    pub fn with_latency(assets: &AssetCatalog, latency: Duration) -> Self {
        Self {
            payment: Arc::new(SimulatedPayment::new().with_latency(latency)),
            chain: Arc::new(SimulatedChain::new().with_latency(latency)),
            kyc: Arc::new(SimulatedKyc::verified()),
            trading: Arc::new(SimulatedTrading::from_catalog(assets).with_latency(latency)),
        }
    }

    /// Type-erased handles for wiring the service.
    #[must_use]
    pub fn providers(&self) -> Providers {
        Providers {
            payment: self.payment.clone(),
            chain: self.chain.clone(),
            kyc: self.kyc.clone(),
            trading: self.trading.clone(),
        }
    }
}
