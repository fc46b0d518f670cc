//! End-to-end balance scenarios through the transaction service.

mod support;

use rust_decimal_macros::dec;

use diboas_core::adapter::outbound::simulated::ChainBehavior;
use diboas_core::application::ProcessOptions;
use diboas_core::domain::{AssetSymbol, Chain, TransactionInput, TransactionKind, TransactionStatus};
use diboas_core::error::Error;

use support::{fees_with_rates, service, user, zero_fees};

fn wait() -> ProcessOptions {
    ProcessOptions::awaiting_confirmation()
}

#[tokio::test]
async fn add_credits_net_of_fees() {
    let alice = user("alice");
    let (service, _) = service(fees_with_rates(&[(TransactionKind::Add, dec!(0.01))]), &alice);

    let outcome = service
        .process_transaction(&alice, &TransactionInput::new("add", 100).payment_method("card"), wait())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.transaction.status(), TransactionStatus::Confirmed);
    assert_eq!(outcome.transaction.fees().total(), dec!(1));
    assert_eq!(outcome.balance.available_for_spending(), dec!(99));
    assert_eq!(outcome.balance.total_usd(), dec!(99));
    assert_eq!(outcome.balance.chain(Chain::Solana).stable_amount, dec!(99));
}

#[tokio::test]
async fn wallet_funded_buy_moves_value_to_invested() {
    let alice = user("alice");
    let (service, _) = service(fees_with_rates(&[(TransactionKind::Buy, dec!(0.02))]), &alice);

    service
        .process_transaction(&alice, &TransactionInput::new("add", 200).payment_method("card"), wait())
        .await
        .unwrap();
    let outcome = service
        .process_transaction(&alice, &TransactionInput::new("buy", 100).asset("BTC"), wait())
        .await
        .unwrap();

    assert!(outcome.success);
    let balance = outcome.balance;
    assert_eq!(balance.available_for_spending(), dec!(100));
    assert_eq!(balance.invested_amount(), dec!(98));
    assert_eq!(balance.total_usd(), dec!(198));
    let holding = balance.asset(&AssetSymbol::new("BTC")).unwrap();
    assert_eq!(holding.invested_amount, dec!(98));
    assert_eq!(holding.chain, Chain::Bitcoin);
}

#[tokio::test]
async fn externally_funded_buy_leaves_available_untouched() {
    let alice = user("alice");
    let (service, simulated) = service(zero_fees(), &alice);

    let outcome = service
        .process_transaction(
            &alice,
            &TransactionInput::new("buy", 100).asset("ETH").payment_method("card"),
            wait(),
        )
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.balance.available_for_spending(), dec!(0));
    assert_eq!(outcome.balance.invested_amount(), dec!(100));
    assert_eq!(simulated.payment.records().len(), 1);
}

#[tokio::test]
async fn selling_the_whole_position_removes_the_asset() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);

    service
        .process_transaction(&alice, &TransactionInput::new("add", 100).payment_method("card"), wait())
        .await
        .unwrap();
    service
        .process_transaction(&alice, &TransactionInput::new("buy", 100).asset("BTC"), wait())
        .await
        .unwrap();
    let outcome = service
        .process_transaction(&alice, &TransactionInput::new("sell", 100).asset("BTC"), wait())
        .await
        .unwrap();

    assert!(outcome.success);
    let balance = outcome.balance;
    assert!(balance.asset(&AssetSymbol::new("BTC")).is_none());
    assert_eq!(balance.invested_amount(), dec!(0));
    assert_eq!(balance.available_for_spending(), dec!(100));
    assert_eq!(balance.total_usd(), dec!(100));
}

#[tokio::test]
async fn overdraw_is_rejected_without_mutation() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    service
        .process_transaction(&alice, &TransactionInput::new("add", 50).payment_method("card"), wait())
        .await
        .unwrap();
    let before = service.get_balance(&alice).unwrap();
    let history_before = service.get_transactions(&alice, 100).unwrap().len();

    let err = service
        .process_transaction(
            &alice,
            &TransactionInput::new("withdraw", 100).destination("bank:checking"),
            wait(),
        )
        .await
        .unwrap_err();

    match err {
        Error::InsufficientFunds { required, available } => {
            assert_eq!(required, dec!(100));
            assert_eq!(available, dec!(50));
        }
        other => panic!("expected insufficient funds, got {other}"),
    }
    assert_eq!(service.get_balance(&alice).unwrap(), before);
    assert_eq!(service.get_transactions(&alice, 100).unwrap().len(), history_before);
}

#[tokio::test]
async fn invest_moves_value_into_strategy_balance() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    service
        .process_transaction(&alice, &TransactionInput::new("add", 80).payment_method("card"), wait())
        .await
        .unwrap();

    let outcome = service
        .process_transaction(&alice, &TransactionInput::new("invest", 30).asset("SOL"), wait())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.balance.strategy_balance(), dec!(30));
    assert_eq!(outcome.balance.available_for_spending(), dec!(50));
    assert_eq!(outcome.balance.total_usd(), dec!(80));
}

#[tokio::test]
async fn send_and_receive_use_handles() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    service
        .process_transaction(&alice, &TransactionInput::new("receive", 40).sender("@bob"), wait())
        .await
        .unwrap();

    let outcome = service
        .process_transaction(&alice, &TransactionInput::new("send", 15).recipient("@carol"), wait())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.transaction.counterparty(), Some("@carol"));
    assert_eq!(outcome.balance.available_for_spending(), dec!(25));
}

#[tokio::test]
async fn balance_is_unchanged_until_confirmation() {
    let alice = user("alice");
    let mut settings = support::settings(zero_fees());
    settings.gateway.poll.max_attempts = 100_000;
    settings.gateway.poll.max_duration = std::time::Duration::from_secs(60);
    let (service, simulated) = support::service_with_settings(settings, &alice);
    simulated.chain.set_behavior(ChainBehavior {
        pending_polls: u32::MAX,
        ..ChainBehavior::default()
    });

    let outcome = service
        .process_transaction(
            &alice,
            &TransactionInput::new("add", 100).payment_method("card"),
            ProcessOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.transaction.status(), TransactionStatus::PendingConfirmation);
    assert_eq!(outcome.balance.total_usd(), dec!(0));
    assert_eq!(service.get_balance(&alice).unwrap().total_usd(), dec!(0));

    let confirmed = service.confirm(&outcome.transaction_id).unwrap();
    assert_eq!(confirmed.status(), TransactionStatus::Confirmed);
    assert!(confirmed.balance_update_applied());
    assert_eq!(service.get_balance(&alice).unwrap().total_usd(), dec!(100));

    // A repeated signal is a no-op, whether or not the record is still retained.
    let _ = service.confirm(&outcome.transaction_id);
    assert_eq!(service.get_balance(&alice).unwrap().total_usd(), dec!(100));
}
