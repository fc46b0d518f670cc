//! Simulated payment rail.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::script::{simulate_latency, FailureScript};
use crate::domain::{PaymentMethod, Usd};
use crate::error::ProviderError;
use crate::port::{PaymentProvider, ProviderReceipt};

/// One operation accepted by the simulated rail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRecord {
    Payment {
        id: String,
        amount: Usd,
        method: PaymentMethod,
    },
    Withdrawal {
        id: String,
        amount: Usd,
        destination: String,
    },
}

#[derive(Debug, Default)]
pub struct SimulatedPayment {
    latency: Duration,
    failures: FailureScript,
    records: Mutex<Vec<PaymentRecord>>,
}

impl SimulatedPayment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next payment or withdrawal fail with `error`.
    pub fn fail_next(&self, error: ProviderError) {
        self.failures.push(error);
    }

    #[must_use]
    pub fn records(&self) -> Vec<PaymentRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl PaymentProvider for SimulatedPayment {
    async fn process_payment(
        &self,
        amount: Usd,
        _currency: &str,
        method: PaymentMethod,
    ) -> Result<ProviderReceipt, ProviderError> {
        simulate_latency(self.latency).await;
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        let id = format!("pay_{}", Uuid::new_v4().simple());
        self.records.lock().push(PaymentRecord::Payment {
            id: id.clone(),
            amount,
            method,
        });
        Ok(ProviderReceipt { id })
    }

    async fn process_withdrawal(
        &self,
        amount: Usd,
        _currency: &str,
        destination: &str,
    ) -> Result<ProviderReceipt, ProviderError> {
        simulate_latency(self.latency).await;
        if let Some(error) = self.failures.take() {
            return Err(error);
        }
        let id = format!("wd_{}", Uuid::new_v4().simple());
        self.records.lock().push(PaymentRecord::Withdrawal {
            id: id.clone(),
            amount,
            destination: destination.to_string(),
        });
        Ok(ProviderReceipt { id })
    }
}
