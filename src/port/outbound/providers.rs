//! Bundle of outbound provider handles.

use std::sync::Arc;

use super::{ChainStatusProvider, KycProvider, PaymentProvider, TradingProvider};

/// The full set of external providers the service is wired with.
#[derive(Clone)]
pub struct Providers {
    pub payment: Arc<dyn PaymentProvider>,
    pub chain: Arc<dyn ChainStatusProvider>,
    pub kyc: Arc<dyn KycProvider>,
    pub trading: Arc<dyn TradingProvider>,
}
