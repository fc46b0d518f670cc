//! Ledger events, subscriptions, snapshots and recovery.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use diboas_core::application::ledger::LedgerSettings;
use diboas_core::application::ProcessOptions;
use diboas_core::domain::{
    Chain, EventKind, LedgerEvent, Transaction, TransactionInput, TransactionKind,
};
use diboas_core::domain::error::ValidationError;
use diboas_core::error::Error;

use support::{ledger, service, user, zero_fees};

fn wait() -> ProcessOptions {
    ProcessOptions::awaiting_confirmation()
}

#[tokio::test]
async fn confirmation_emits_balance_and_transaction_events() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    let seen: Arc<Mutex<Vec<EventKind>>> = Arc::default();

    let _subs: Vec<_> = [
        EventKind::TransactionAdded,
        EventKind::TransactionConfirmed,
        EventKind::BalanceUpdated,
    ]
    .into_iter()
    .map(|kind| {
        let seen = Arc::clone(&seen);
        service.subscribe(kind, move |event| {
            seen.lock().push(event.kind());
            Ok(())
        })
    })
    .collect();

    service
        .process_transaction(&alice, &TransactionInput::new("add", 30).payment_method("card"), wait())
        .await
        .unwrap();

    let seen = seen.lock().clone();
    assert_eq!(seen.first(), Some(&EventKind::TransactionAdded));
    assert_eq!(seen.iter().filter(|k| **k == EventKind::BalanceUpdated).count(), 1);
    assert_eq!(seen.iter().filter(|k| **k == EventKind::TransactionConfirmed).count(), 1);
}

#[tokio::test]
async fn balance_event_carries_the_new_balance() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    let totals: Arc<Mutex<Vec<_>>> = Arc::default();
    let sink = Arc::clone(&totals);
    let _sub = service.subscribe(EventKind::BalanceUpdated, move |event| {
        if let LedgerEvent::BalanceUpdated { balance, transaction_id, .. } = event {
            sink.lock().push((balance.total_usd(), transaction_id.is_some()));
        }
        Ok(())
    });

    service
        .process_transaction(&alice, &TransactionInput::new("add", 30).payment_method("card"), wait())
        .await
        .unwrap();

    assert_eq!(*totals.lock(), vec![(dec!(30), true)]);
}

#[tokio::test]
async fn failing_and_panicking_subscribers_are_dropped() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    let healthy = Arc::new(AtomicUsize::new(0));

    let _failing = service.subscribe(EventKind::TransactionAdded, |_| {
        anyhow::bail!("listener is gone")
    });
    let _panicking = service.subscribe(EventKind::TransactionAdded, |_| panic!("listener bug"));
    let counter = Arc::clone(&healthy);
    let _healthy = service.subscribe(EventKind::TransactionAdded, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    for amount in [10, 20] {
        service
            .process_transaction(&alice, &TransactionInput::new("receive", amount).sender("@carol"), wait())
            .await
            .unwrap();
    }

    assert_eq!(healthy.load(Ordering::SeqCst), 2);
    assert_eq!(
        service.ledger().bus().subscriber_count(EventKind::TransactionAdded),
        1
    );
}

#[tokio::test]
async fn unsubscribed_callbacks_stop_receiving() {
    let alice = user("alice");
    let (service, _) = service(zero_fees(), &alice);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let sub = service.subscribe(EventKind::TransactionAdded, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    service
        .process_transaction(&alice, &TransactionInput::new("receive", 10).sender("@carol"), wait())
        .await
        .unwrap();
    assert!(sub.unsubscribe());
    service
        .process_transaction(&alice, &TransactionInput::new("receive", 10).sender("@carol"), wait())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn snapshot_restores_into_a_fresh_service() {
    let alice = user("alice");
    let (first, _) = service(zero_fees(), &alice);
    first
        .process_transaction(&alice, &TransactionInput::new("add", 100).payment_method("card"), wait())
        .await
        .unwrap();
    first
        .process_transaction(&alice, &TransactionInput::new("buy", 40).asset("BTC"), wait())
        .await
        .unwrap();
    let snapshot = first.snapshot(&alice).unwrap();
    first.dispose();

    let (second, _) = service(zero_fees(), &user("bob"));
    let restored = second.restore(snapshot.clone()).unwrap();

    assert_eq!(restored, snapshot.balance);
    assert_eq!(restored.total_usd(), dec!(100));
    assert_eq!(second.get_transactions(&alice, 10).unwrap().len(), 2);

    // Settled records stay settled after the move.
    let add = snapshot
        .transactions
        .iter()
        .find(|t| t.kind() == TransactionKind::Add)
        .unwrap();
    assert!(second.ledger().is_settled(&alice, add.id()));
}

#[test]
fn replayed_confirmation_is_not_applied_twice() {
    let alice = user("alice");
    let ledger = ledger(zero_fees(), LedgerSettings::default());
    ledger.open_session(&alice).unwrap();
    let tx = Transaction::new(alice.clone(), TransactionKind::Receive, dec!(25), Chain::Solana);
    ledger.add_transaction(tx.clone()).unwrap();

    ledger.apply_confirmed(&tx).unwrap();
    ledger.apply_confirmed(&tx).unwrap();

    assert_eq!(ledger.get_balance(&alice).unwrap().available_for_spending(), dec!(25));
    assert!(ledger.is_settled(&alice, tx.id()));
}

#[test]
fn reinitialize_resets_balance_and_keeps_history() {
    let alice = user("alice");
    let ledger = ledger(zero_fees(), LedgerSettings::default());
    ledger.open_session(&alice).unwrap();
    let tx = Transaction::new(alice.clone(), TransactionKind::Receive, dec!(25), Chain::Solana);
    ledger.add_transaction(tx.clone()).unwrap();
    ledger.apply_confirmed(&tx).unwrap();

    let balance = ledger.reinitialize(&alice).unwrap();

    assert_eq!(balance.total_usd(), dec!(0));
    assert_eq!(ledger.get_transactions(&alice, 10).unwrap().len(), 1);
}

#[test]
fn history_cap_evicts_oldest_records() {
    let alice = user("alice");
    let ledger = ledger(
        zero_fees(),
        LedgerSettings {
            history_cap: 3,
            ..LedgerSettings::default()
        },
    );
    ledger.open_session(&alice).unwrap();
    let ids: Vec<_> = (1..=5)
        .map(|n| {
            let tx = Transaction::new(alice.clone(), TransactionKind::Receive, Decimal::from(n), Chain::Solana);
            ledger.add_transaction(tx.clone()).unwrap();
            tx.id().clone()
        })
        .collect();

    let history = ledger.get_transactions(&alice, 10).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id(), &ids[4]);
    assert!(matches!(
        ledger.get_transaction(&alice, &ids[0]),
        Err(Error::TransactionNotFound { .. })
    ));
}

#[test]
fn closed_sessions_are_unknown() {
    let alice = user("alice");
    let ledger = ledger(zero_fees(), LedgerSettings::default());
    ledger.open_session(&alice).unwrap();

    assert!(ledger.close_session(&alice));
    assert!(!ledger.close_session(&alice));
    assert!(matches!(
        ledger.get_balance(&alice),
        Err(Error::UnknownUser { .. })
    ));
}

#[test]
fn overflowing_confirmation_is_refused_without_corrupting() {
    let alice = user("alice");
    let ledger = ledger(
        zero_fees().with_max_amount(Decimal::MAX),
        LedgerSettings::default(),
    );
    ledger.open_session(&alice).unwrap();
    let huge = Decimal::MAX - Decimal::ONE;

    let first = Transaction::new(alice.clone(), TransactionKind::Add, huge, Chain::Solana);
    ledger.add_transaction(first.clone()).unwrap();
    ledger.apply_confirmed(&first).unwrap();

    let second = Transaction::new(alice.clone(), TransactionKind::Add, huge, Chain::Solana);
    ledger.add_transaction(second.clone()).unwrap();
    assert!(matches!(
        ledger.apply_confirmed(&second),
        Err(Error::BalanceOverflow { .. })
    ));

    let balance = ledger.get_balance(&alice).unwrap();
    assert_eq!(balance.available_for_spending(), huge);
    assert!(!ledger.is_settled(&alice, second.id()));
}

#[test]
fn amounts_above_configured_maximum_never_reach_the_balance() {
    let alice = user("alice");
    let ledger = ledger(zero_fees().with_max_amount(dec!(500)), LedgerSettings::default());
    ledger.open_session(&alice).unwrap();
    let tx = Transaction::new(alice.clone(), TransactionKind::Receive, dec!(501), Chain::Solana);
    ledger.add_transaction(tx.clone()).unwrap();

    assert!(matches!(
        ledger.apply_confirmed(&tx),
        Err(Error::Validation(ValidationError::AboveMaximum { .. }))
    ));
    assert_eq!(ledger.get_balance(&alice).unwrap().total_usd(), dec!(0));
}
