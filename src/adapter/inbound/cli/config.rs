//! Handlers for the `config` command group.

use std::path::Path;

use crate::adapter::inbound::cli::output;
use crate::domain::{Chain, TransactionKind};
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    if output::is_json() {
        output::record("config", &config);
        return Ok(());
    }

    output::section("Logging");
    output::field("Level", &config.logging.level);
    output::field("Format", &config.logging.format);

    output::section("Ledger");
    output::field("History cap", config.ledger.history_cap);
    output::field("Lock wait", format!("{}ms", config.ledger.lock_wait_ms));
    output::field("Max amount", config.ledger.max_amount);
    output::field("Settled cap", config.ledger.settled_cap);
    output::field(
        "Lock stale",
        format!("{}ms", config.ledger.lock_stale_after_ms),
    );

    let gateway = &config.gateway;
    output::section("Gateway");
    output::field("Poll interval", format!("{}ms", gateway.poll_interval_ms));
    output::field("Backoff", format!("x{}", gateway.backoff_multiplier));
    output::field("Max attempts", gateway.max_poll_attempts);
    output::field("Max duration", format!("{}ms", gateway.max_poll_duration_ms));
    output::field("Retention", format!("{}ms", gateway.retention_ms));
    output::field("Retries", gateway.retry.max_attempts);

    output::section("Routing");
    output::field("Default chain", config.routing.default_chain);
    output::field("Bridge fee", format!("${}", config.routing.bridge_base_fee));
    output::field("Bridge rate", config.routing.bridge_rate);
    output::field("Slippage", config.routing.slippage_rate);

    let fees = config.fee_schedule();
    output::section("Fees");
    for kind in TransactionKind::ALL {
        let k = fees.kind(kind);
        output::field(
            kind.as_str(),
            format!(
                "diboas {} | provider {} (cap ${}) | min ${}",
                k.diboas_rate, k.provider_rate, k.provider_cap, k.min_amount
            ),
        );
    }

    output::section("Networks");
    for chain in Chain::ALL {
        output::field(chain.as_str(), format!("${}", fees.network_fee(chain)));
    }

    let assets = config.asset_catalog();
    output::section("Assets");
    for symbol in assets.symbols() {
        if let Some(info) = assets.get(symbol) {
            let status = if info.tradable { "" } else { " (not tradable)" };
            output::field(
                symbol.as_str(),
                format!("{} @ ${}{status}", info.chain, info.reference_price),
            );
        }
    }
    Ok(())
}

/// Execute `config check`.
pub fn execute_check(path: &Path) -> Result<()> {
    Config::load(path)?;
    output::success("Configuration valid");
    output::field("Path", path.display());
    Ok(())
}
