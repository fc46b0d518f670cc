#![allow(dead_code)]

pub mod architecture;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use diboas_core::adapter::outbound::simulated::SimulatedProviders;
use diboas_core::application::gateway::{GatewaySettings, PollPolicy};
use diboas_core::application::ledger::{BalanceLedger, LedgerSettings};
use diboas_core::application::router::RoutingSettings;
use diboas_core::application::{ServiceSettings, TransactionService};
use diboas_core::domain::{
    AssetCatalog, AssetInfo, AssetSymbol, Chain, FeeSchedule, KindFees, RoutingFees,
    TransactionKind, UserId,
};

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

pub fn no_fees() -> KindFees {
    KindFees {
        diboas_rate: Decimal::ZERO,
        provider_rate: Decimal::ZERO,
        provider_cap: Decimal::ZERO,
        min_amount: Decimal::ZERO,
    }
}

/// Schedule charging only the given platform rates; no network, provider or
/// routing costs and no minimums.
pub fn fees_with_rates(rates: &[(TransactionKind, Decimal)]) -> FeeSchedule {
    let mut kinds: BTreeMap<TransactionKind, KindFees> =
        TransactionKind::ALL.iter().map(|k| (*k, no_fees())).collect();
    for (kind, rate) in rates {
        kinds.insert(
            *kind,
            KindFees {
                diboas_rate: *rate,
                ..no_fees()
            },
        );
    }
    FeeSchedule::new(
        kinds,
        BTreeMap::new(),
        RoutingFees {
            bridge_base_fee: Decimal::ZERO,
            bridge_rate: Decimal::ZERO,
            slippage_rate: Decimal::ZERO,
        },
    )
}

pub fn zero_fees() -> FeeSchedule {
    fees_with_rates(&[])
}

/// Schedule with network and bridge costs, for routing tests.
pub fn routed_fees() -> FeeSchedule {
    let networks = Chain::ALL.iter().map(|c| (*c, dec!(1))).collect();
    FeeSchedule::new(
        TransactionKind::ALL.iter().map(|k| (*k, no_fees())).collect(),
        networks,
        RoutingFees {
            bridge_base_fee: dec!(2),
            bridge_rate: dec!(0.01),
            slippage_rate: Decimal::ZERO,
        },
    )
}

pub fn assets() -> AssetCatalog {
    let asset = |chain, price| AssetInfo {
        chain,
        reference_price: price,
        tradable: true,
    };
    AssetCatalog::new(BTreeMap::from([
        (AssetSymbol::new("BTC"), asset(Chain::Bitcoin, dec!(50000))),
        (AssetSymbol::new("ETH"), asset(Chain::Ethereum, dec!(2500))),
        (AssetSymbol::new("SOL"), asset(Chain::Solana, dec!(100))),
    ]))
}

/// Poll fast and give up quickly.
pub fn fast_gateway() -> GatewaySettings {
    GatewaySettings {
        poll: PollPolicy {
            interval: Duration::from_millis(5),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_millis(5),
            max_attempts: 20,
            max_duration: Duration::from_secs(5),
        },
        retention: Duration::from_millis(50),
    }
}

pub fn settings(fees: FeeSchedule) -> ServiceSettings {
    ServiceSettings {
        ledger: LedgerSettings::default(),
        gateway: fast_gateway(),
        routing: RoutingSettings::default(),
        fees,
        assets: assets(),
        confirmation_timeout: Duration::from_secs(5),
    }
}

/// Service over simulated providers, with one open session for `user_id`.
pub fn service(fees: FeeSchedule, user_id: &UserId) -> (TransactionService, SimulatedProviders) {
    service_with_settings(settings(fees), user_id)
}

pub fn service_with_settings(
    settings: ServiceSettings,
    user_id: &UserId,
) -> (TransactionService, SimulatedProviders) {
    let simulated = SimulatedProviders::new(&settings.assets);
    let service = TransactionService::new(settings, simulated.providers());
    service.open_session(user_id).expect("open session");
    (service, simulated)
}

pub fn ledger(fees: FeeSchedule, settings: LedgerSettings) -> Arc<BalanceLedger> {
    Arc::new(BalanceLedger::new(settings, Arc::new(fees)))
}

/// Wait until `check` holds or the deadline passes.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
