//! Concurrent requests for one user.

mod support;

use std::sync::Arc;

use rust_decimal_macros::dec;

use diboas_core::application::ProcessOptions;
use diboas_core::domain::{Chain, FeeSnapshot, Transaction, TransactionInput, TransactionKind};
use diboas_core::error::Error;

use support::{ledger, service, user, zero_fees};

#[tokio::test]
async fn concurrent_adds_sum_regardless_of_order() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for amount in [100, 50, 25] {
        let service = Arc::clone(&service);
        let alice = alice.clone();
        handles.push(tokio::spawn(async move {
            service
                .process_transaction(
                    &alice,
                    &TransactionInput::new("add", amount).payment_method("card"),
                    ProcessOptions::awaiting_confirmation(),
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().success);
    }

    let balance = service.get_balance(&alice).unwrap();
    assert_eq!(balance.available_for_spending(), dec!(175));
    assert_eq!(balance.total_usd(), dec!(175));
}

#[test]
fn threads_hammering_the_ledger_keep_the_sum() {
    let alice = user("alice");
    let ledger = ledger(zero_fees(), Default::default());
    ledger.open_session(&alice).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            let alice = alice.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    let tx = Transaction::new(alice.clone(), TransactionKind::Add, dec!(2), Chain::Sui)
                        .with_fees(FeeSnapshot::zero());
                    ledger.update_balance(&tx).unwrap();
                }
            });
        }
    });

    let balance = ledger.get_balance(&alice).unwrap();
    assert_eq!(balance.available_for_spending(), dec!(800));
    assert_eq!(balance.chain(Chain::Sui).stable_amount, dec!(800));
}

#[tokio::test]
async fn concurrent_debits_cannot_jointly_overdraw() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    service
        .process_transaction(
            &alice,
            &TransactionInput::new("add", 100).payment_method("card"),
            ProcessOptions::awaiting_confirmation(),
        )
        .await
        .unwrap();

    let send = |to: &'static str| {
        let input = TransactionInput::new("send", 60).recipient(to);
        let service = &service;
        let alice = alice.clone();
        async move {
            service
                .process_transaction(&alice, &input, ProcessOptions::awaiting_confirmation())
                .await
        }
    };
    let (first, second) = tokio::join!(send("@bob"), send("@carol"));

    let outcomes = [first, second];
    let succeeded = outcomes
        .iter()
        .filter(|r| r.as_ref().is_ok_and(|o| o.success))
        .count();
    let rejected = outcomes
        .iter()
        .filter(|r| matches!(r, Err(Error::InsufficientFunds { .. })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 1);
    assert_eq!(service.get_balance(&alice).unwrap().available_for_spending(), dec!(40));
}
