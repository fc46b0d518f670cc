//! Composition root: builds the transaction service from configuration.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::retry::RetryingChainProvider;
use crate::adapter::outbound::simulated::SimulatedProviders;
use crate::application::TransactionService;
use crate::infrastructure::config::settings::Config;
use crate::port::{ChainStatusProvider, Providers};

/// Wrap the chain provider with transient-error retries from `[gateway.retry]`.
#[must_use]
pub fn with_chain_retries(config: &Config, providers: Providers) -> Providers {
    let chain: Arc<dyn ChainStatusProvider> = Arc::new(RetryingChainProvider::new(
        providers.chain,
        config.gateway.retry.policy(),
    ));
    Providers { chain, ..providers }
}

/// Build a service wired to the given providers.
#[must_use]
pub fn build_service(config: &Config, providers: Providers) -> TransactionService {
    let providers = with_chain_retries(config, providers);
    let settings = config.service_settings();
    info!(
        default_chain = %settings.routing.default_chain,
        assets = settings.assets.len(),
        history_cap = settings.ledger.history_cap,
        "Transaction service configured"
    );
    TransactionService::new(settings, providers)
}

/// Build a service backed by in-memory providers.
///
/// The simulated providers are returned alongside so callers can script them.
#[must_use]
pub fn build_simulated(config: &Config) -> (TransactionService, SimulatedProviders) {
    let simulated = SimulatedProviders::new(&config.asset_catalog());
    let service = build_service(config, simulated.providers());
    (service, simulated)
}
