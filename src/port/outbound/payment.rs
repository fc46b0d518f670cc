//! Payment provider port for fiat on- and off-ramps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{PaymentMethod, Usd};
use crate::error::ProviderError;

/// Acknowledgement of an accepted payment or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderReceipt {
    /// Provider-side reference for the operation.
    pub id: String,
}

/// Moves fiat in and out of the platform.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Charge an external instrument.
    async fn process_payment(
        &self,
        amount: Usd,
        currency: &str,
        method: PaymentMethod,
    ) -> Result<ProviderReceipt, ProviderError>;

    /// Pay out to an external destination.
    async fn process_withdrawal(
        &self,
        amount: Usd,
        currency: &str,
        destination: &str,
    ) -> Result<ProviderReceipt, ProviderError>;
}
