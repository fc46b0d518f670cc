//! Simulated chain status provider.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use tracing::debug;

use super::script::{simulate_latency, FailureScript};
use crate::domain::Chain;
use crate::error::ProviderError;
use crate::port::{
    ChainState, ChainStatus, ChainStatusProvider, SubmissionReceipt, TransactionDescriptor,
};

/// How submitted transactions progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainBehavior {
    /// Status queries answered with `Confirming` before the outcome.
    pub pending_polls: u32,
    /// State reported once the pending polls are used up.
    pub outcome: ChainState,
    /// Confirmations reported with the outcome.
    pub confirmations: u32,
}

impl Default for ChainBehavior {
    fn default() -> Self {
        Self {
            pending_polls: 0,
            outcome: ChainState::Confirmed,
            confirmations: 1,
        }
    }
}

#[derive(Debug)]
struct Tracked {
    descriptor: TransactionDescriptor,
    polls: u32,
    behavior: ChainBehavior,
}

/// In-memory chain that confirms whatever it is given, unless told otherwise.
#[derive(Debug, Default)]
pub struct SimulatedChain {
    behavior: Mutex<ChainBehavior>,
    latency: Duration,
    submit_failures: FailureScript,
    status_failures: FailureScript,
    tracked: DashMap<String, Tracked>,
}

impl SimulatedChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_behavior(behavior: ChainBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Behavior applied to transactions submitted from now on.
    pub fn set_behavior(&self, behavior: ChainBehavior) {
        *self.behavior.lock() = behavior;
    }

    #[must_use]
    pub fn behavior(&self) -> ChainBehavior {
        *self.behavior.lock()
    }

    /// Make the next submission fail with `error`.
    pub fn fail_next_submission(&self, error: ProviderError) {
        self.submit_failures.push(error);
    }

    /// Make the next status query fail with `error`.
    pub fn fail_next_status(&self, error: ProviderError) {
        self.status_failures.push(error);
    }

    /// Descriptors accepted so far, in no particular order.
    #[must_use]
    pub fn submissions(&self) -> Vec<TransactionDescriptor> {
        self.tracked
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Status queries answered for `tx_hash`.
    #[must_use]
    pub fn polls(&self, tx_hash: &str) -> u32 {
        self.tracked.get(tx_hash).map_or(0, |t| t.polls)
    }
}

#[async_trait]
impl ChainStatusProvider for SimulatedChain {
    async fn submit_transaction(
        &self,
        descriptor: &TransactionDescriptor,
    ) -> Result<SubmissionReceipt, ProviderError> {
        simulate_latency(self.latency).await;
        if let Some(error) = self.submit_failures.take() {
            return Err(error);
        }

        let tx_hash = random_hash(descriptor.chain);
        let behavior = self.behavior();
        debug!(
            tx_id = %descriptor.id,
            chain = %descriptor.chain,
            tx_hash = %tx_hash,
            "Simulated submission accepted"
        );
        self.tracked.insert(
            tx_hash.clone(),
            Tracked {
                descriptor: descriptor.clone(),
                polls: 0,
                behavior,
            },
        );

        Ok(SubmissionReceipt {
            explorer_link: Some(explorer_link(descriptor.chain, &tx_hash)),
            estimated_confirmation: Some(estimated_finality(descriptor.chain)),
            tx_hash,
        })
    }

    async fn get_transaction_status(&self, tx_hash: &str) -> Result<ChainStatus, ProviderError> {
        simulate_latency(self.latency).await;
        if let Some(error) = self.status_failures.take() {
            return Err(error);
        }

        let Some(mut tracked) = self.tracked.get_mut(tx_hash) else {
            return Ok(ChainStatus::new(ChainState::Pending, 0));
        };
        tracked.polls += 1;
        let behavior = tracked.behavior;
        if tracked.polls <= behavior.pending_polls {
            return Ok(ChainStatus::new(ChainState::Confirming, 0));
        }
        Ok(ChainStatus::new(behavior.outcome, behavior.confirmations))
    }
}

fn random_hash(chain: Chain) -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    match chain {
        Chain::Ethereum | Chain::Sui => format!("0x{hex}"),
        Chain::Bitcoin | Chain::Solana => hex,
    }
}

fn explorer_link(chain: Chain, tx_hash: &str) -> String {
    match chain {
        Chain::Bitcoin => format!("https://mempool.space/tx/{tx_hash}"),
        Chain::Ethereum => format!("https://etherscan.io/tx/{tx_hash}"),
        Chain::Solana => format!("https://solscan.io/tx/{tx_hash}"),
        Chain::Sui => format!("https://suiscan.xyz/mainnet/tx/{tx_hash}"),
    }
}

fn estimated_finality(chain: Chain) -> Duration {
    match chain {
        Chain::Bitcoin => Duration::from_secs(600),
        Chain::Ethereum => Duration::from_secs(15),
        Chain::Solana => Duration::from_secs(1),
        Chain::Sui => Duration::from_secs(3),
    }
}
