//! Handler for `diboas simulate`.
//!
//! Runs a list of requests for one user through the full service, awaiting
//! each confirmation, then prints the resulting balance and history.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::command::SimulateArgs;
use crate::adapter::inbound::cli::output;
use crate::application::{ProcessOptions, TransactionService};
use crate::domain::{EventKind, LedgerEvent, TransactionInput, UserId};
use crate::error::{ConfigError, Result};
use crate::infrastructure::bootstrap::build_simulated;
use crate::infrastructure::config::Config;

/// Requests run when no script is given.
fn demo_script() -> Vec<TransactionInput> {
    vec![
        TransactionInput::new("add", 200).payment_method("card"),
        TransactionInput::new("buy", 100).asset("BTC"),
        TransactionInput::new("send", 20).recipient("@friend"),
        TransactionInput::new("transfer", 15)
            .recipient("0x52908400098527886E0F7030069857D2E4169EE7"),
        TransactionInput::new("sell", 50).asset("BTC"),
        TransactionInput::new("withdraw", 500).destination("bank:checking"),
    ]
}

fn load_script(path: &Path) -> Result<Vec<TransactionInput>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_config(args: &SimulateArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(interval) = args.poll_interval_ms {
        if interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        config.gateway.poll_interval_ms = interval;
        config.gateway.max_poll_interval_ms = config.gateway.max_poll_interval_ms.max(interval);
    }
    config.validate()?;
    Ok(config)
}

/// Execute `simulate`.
pub async fn execute(args: SimulateArgs) -> Result<()> {
    let config = load_config(&args)?;
    let script = match &args.script {
        Some(path) => load_script(path)?,
        None => demo_script(),
    };

    let (service, _providers) = build_simulated(&config);
    let user = UserId::new(args.user.as_str());
    service.open_session(&user)?;

    let _events = service.subscribe(EventKind::BalanceUpdated, |event| {
        if let LedgerEvent::BalanceUpdated { balance, .. } = event {
            if !output::is_json() {
                output::note(&format!(
                    "balance updated: available ${} invested ${} total ${}",
                    balance.available_for_spending(),
                    balance.invested_amount(),
                    balance.total_usd()
                ));
            }
        }
        Ok(())
    });

    output::section(&format!("Simulating {} requests for {user}", script.len()));
    let mut failures = 0usize;
    for (index, input) in script.iter().enumerate() {
        let label = input.kind.as_deref().unwrap_or("?");
        match service
            .process_transaction(&user, input, ProcessOptions::awaiting_confirmation())
            .await
        {
            Ok(outcome) if outcome.success => {
                let tx = &outcome.transaction;
                if output::is_json() {
                    output::record("transaction", tx);
                } else {
                    output::success(&format!(
                        "#{} {label} ${} on {} (fees ${})",
                        index + 1,
                        tx.amount(),
                        tx.chain(),
                        tx.fees().total()
                    ));
                }
            }
            Ok(outcome) => {
                failures += 1;
                let reason = outcome.transaction.error().unwrap_or("reconciliation required");
                output::warning(&format!("#{} {label} failed: {reason}", index + 1));
            }
            Err(e) => {
                failures += 1;
                output::warning(&format!("#{} {label} rejected: {e}", index + 1));
            }
        }
    }

    print_summary(&service, &user, args.history, failures)?;
    service.dispose();
    Ok(())
}

fn print_summary(
    service: &TransactionService,
    user: &UserId,
    history: usize,
    failures: usize,
) -> Result<()> {
    let balance = service.get_unified_balance(user)?;
    let transactions = service.get_transactions(user, history)?;

    if output::is_json() {
        output::record(
            "summary",
            &json!({
                "balance": balance,
                "transactions": transactions,
                "failures": failures,
            }),
        );
        return Ok(());
    }

    output::section("Balance");
    output::field("Available", format!("${}", balance.available));
    output::field("Invested", format!("${}", balance.invested));
    output::field("Strategy", format!("${}", balance.strategy));
    output::field("Total", format!("${}", balance.total));
    for (chain, chain_balance) in &balance.chains {
        output::field(chain.as_str(), format!("${}", chain_balance.usd_value));
    }

    output::section("History");
    for tx in &transactions {
        output::field(
            tx.kind().as_str(),
            format!("${} {} {}", tx.amount(), tx.status(), tx.id()),
        );
    }
    if failures > 0 {
        output::note(&format!("{failures} request(s) did not complete"));
    }
    Ok(())
}
