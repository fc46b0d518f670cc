//! Blockchain status provider port.
//!
//! The confirmation gateway submits every planned transaction through this
//! port and polls it until a terminal on-chain state is observed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{AssetSymbol, Chain, Transaction, TransactionId, TransactionKind, Usd};
use crate::error::ProviderError;

/// What the chain provider needs to know about a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub chain: Chain,
    pub amount: Usd,
    pub asset: Option<AssetSymbol>,
    pub counterparty: Option<String>,
}

impl From<&Transaction> for TransactionDescriptor {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id().clone(),
            kind: tx.kind(),
            chain: tx.chain(),
            amount: tx.amount(),
            asset: tx.asset().map(|a| a.symbol.clone()),
            counterparty: tx.counterparty().map(str::to_string),
        }
    }
}

/// Accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub tx_hash: String,
    pub explorer_link: Option<String>,
    /// Provider's estimate of time to finality.
    pub estimated_confirmation: Option<Duration>,
}

/// On-chain state reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainState {
    Pending,
    Confirming,
    Confirmed,
    Failed,
    Timeout,
}

impl ChainState {
    /// Returns true if polling can stop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChainState::Confirmed | ChainState::Failed | ChainState::Timeout
        )
    }
}

/// A single status observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub state: ChainState,
    pub confirmations: u32,
}

impl ChainStatus {
    #[must_use]
    pub const fn new(state: ChainState, confirmations: u32) -> Self {
        Self {
            state,
            confirmations,
        }
    }
}

/// Submits transactions and reports their on-chain status.
#[async_trait]
pub trait ChainStatusProvider: Send + Sync {
    async fn submit_transaction(
        &self,
        descriptor: &TransactionDescriptor,
    ) -> Result<SubmissionReceipt, ProviderError>;

    async fn get_transaction_status(&self, tx_hash: &str) -> Result<ChainStatus, ProviderError>;
}

#[async_trait]
impl<T: ChainStatusProvider + ?Sized> ChainStatusProvider for Arc<T> {
    async fn submit_transaction(
        &self,
        descriptor: &TransactionDescriptor,
    ) -> Result<SubmissionReceipt, ProviderError> {
        (**self).submit_transaction(descriptor).await
    }

    async fn get_transaction_status(&self, tx_hash: &str) -> Result<ChainStatus, ProviderError> {
        (**self).get_transaction_status(tx_hash).await
    }
}
