//! Integration tests for the balance operation engine.
//!
//! Covers the deposit/withdraw scenarios, rollback on failure, one wallet per
//! user, and serialization of concurrent operations on a single wallet.

mod common;

use common::{Harness, new_user, unique_email};
use purse::db::DEFAULT_LOCK_TIMEOUT;
use purse::wallet::{OperationKind, WalletError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_deposit() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(dec!(100.00)).await;

    let updated = h
        .wallets
        .perform_operation(wallet.wallet_id, "DEPOSIT", dec!(50.00))
        .await
        .expect("Deposit should succeed");

    assert_eq!(updated.balance, dec!(150.00));
    let stored = h.wallets.get_wallet(wallet.wallet_id).await.unwrap();
    assert_eq!(stored.balance, dec!(150.00));
    assert_eq!(stored.balance.to_string(), "150.00");
}

#[tokio::test]
async fn test_withdraw() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(dec!(100.00)).await;

    let updated = h
        .wallets
        .perform_operation(wallet.wallet_id, "WITHDRAW", dec!(50.00))
        .await
        .expect("Withdraw should succeed");

    assert_eq!(updated.balance, dec!(50.00));
    assert_eq!(
        h.wallets.get_wallet(wallet.wallet_id).await.unwrap().balance,
        dec!(50.00)
    );
}

#[tokio::test]
async fn test_insufficient_funds_leaves_balance_unchanged() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(dec!(100.00)).await;
    let before = h.wallets.get_wallet(wallet.wallet_id).await.unwrap();

    let err = h
        .wallets
        .perform_operation(wallet.wallet_id, "WITHDRAW", dec!(150.00))
        .await
        .unwrap_err();

    match err {
        WalletError::InsufficientFunds {
            available,
            required,
        } => {
            assert_eq!(available, dec!(100.00));
            assert_eq!(required, dec!(150.00));
        }
        other => panic!("Expected InsufficientFunds, got {other:?}"),
    }

    let after = h.wallets.get_wallet(wallet.wallet_id).await.unwrap();
    assert_eq!(after, before, "Failed withdrawal must not touch the row");
}

#[tokio::test]
async fn test_invalid_operation_type() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(dec!(100.00)).await;

    let err = h
        .wallets
        .perform_operation(wallet.wallet_id, "INVALID", dec!(50.00))
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::InvalidOperation(ref op) if op == "INVALID"));
    assert_eq!(
        h.wallets.get_wallet(wallet.wallet_id).await.unwrap().balance,
        dec!(100.00)
    );
}

#[tokio::test]
async fn test_invalid_operation_takes_no_lock() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(dec!(100.00)).await;

    // Hold the row lock; an invalid operation must still fail immediately.
    let mut holder = h.store.begin().await.unwrap();
    holder.get_wallet_for_update(wallet.wallet_id, DEFAULT_LOCK_TIMEOUT).await.unwrap();

    let result = tokio::time::timeout(
        std::time::Duration::from_millis(500),
        h.wallets
            .perform_operation(wallet.wallet_id, "INVALID", dec!(1.00)),
    )
    .await
    .expect("Invalid operation must not wait for the row lock");
    assert!(matches!(result, Err(WalletError::InvalidOperation(_))));

    holder.rollback().await.unwrap();
}

#[tokio::test]
async fn test_unknown_wallet() {
    let h = Harness::in_memory();
    let missing = uuid::Uuid::new_v4();

    let err = h
        .wallets
        .perform_operation(missing, "DEPOSIT", dec!(10.00))
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::WalletNotFound(id) if id == missing));
    assert!(h.wallets.list_wallets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unique_wallet_per_user() {
    let h = Harness::in_memory();
    let created = h
        .users
        .create_user(new_user(&unique_email("unique")))
        .await
        .unwrap();

    let err = h
        .wallets
        .create_wallet(created.user.id, dec!(50.00))
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::WalletAlreadyExists(id) if id == created.user.id));
    assert_eq!(h.wallets.list_wallets().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_wallet_id_is_stable_across_operations() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(dec!(10.00)).await;

    let after_deposit = h.wallets.deposit(wallet.wallet_id, dec!(0.01)).await.unwrap();
    let after_withdraw = h.wallets.withdraw(wallet.wallet_id, dec!(10.01)).await.unwrap();

    assert_eq!(after_deposit.wallet_id, wallet.wallet_id);
    assert_eq!(after_withdraw.wallet_id, wallet.wallet_id);
    assert_eq!(after_withdraw.user_id, wallet.user_id);
    assert_eq!(after_withdraw.balance, Decimal::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    const ATTEMPTS: usize = 20;
    const AFFORDABLE: usize = 7;

    let h = Harness::in_memory();
    let amount = dec!(12.50);
    let wallet = h
        .funded_wallet(amount * Decimal::from(AFFORDABLE as u64))
        .await;

    let mut handles = Vec::with_capacity(ATTEMPTS);
    for _ in 0..ATTEMPTS {
        let wallets = Arc::clone(&h.wallets);
        let wallet_id = wallet.wallet_id;
        handles.push(tokio::spawn(async move {
            wallets.apply(wallet_id, OperationKind::Withdraw, amount).await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.expect("task should not panic") {
            Ok(updated) => {
                assert!(updated.balance >= Decimal::ZERO);
                successes += 1;
            }
            Err(WalletError::InsufficientFunds { .. }) => insufficient += 1,
            Err(other) => panic!("Unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, AFFORDABLE);
    assert_eq!(insufficient, ATTEMPTS - AFFORDABLE);
    assert_eq!(
        h.wallets.get_wallet(wallet.wallet_id).await.unwrap().balance,
        Decimal::ZERO
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_not_lost() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(Decimal::ZERO).await;

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let wallets = Arc::clone(&h.wallets);
            let wallet_id = wallet.wallet_id;
            tokio::spawn(async move { wallets.deposit(wallet_id, dec!(1.01)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().expect("Deposit should succeed");
    }

    assert_eq!(
        h.wallets.get_wallet(wallet.wallet_id).await.unwrap().balance,
        dec!(50.50)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_operations_on_different_wallets_do_not_block() {
    let h = Harness::in_memory();
    let busy = h.funded_wallet(dec!(10.00)).await;
    let free = h.funded_wallet(dec!(10.00)).await;

    let mut holder = h.store.begin().await.unwrap();
    holder.get_wallet_for_update(busy.wallet_id, DEFAULT_LOCK_TIMEOUT).await.unwrap();

    let updated = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        h.wallets.withdraw(free.wallet_id, dec!(5.00)),
    )
    .await
    .expect("Other wallets must stay available")
    .unwrap();
    assert_eq!(updated.balance, dec!(5.00));

    holder.rollback().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocked_operation_sees_committed_balance() {
    let h = Harness::in_memory();
    let wallet = h.funded_wallet(dec!(100.00)).await;

    // Commit a withdrawal while a second withdrawal is queued on the lock.
    let mut holder = h.store.begin().await.unwrap();
    holder.get_wallet_for_update(wallet.wallet_id, DEFAULT_LOCK_TIMEOUT).await.unwrap();

    let wallets = Arc::clone(&h.wallets);
    let wallet_id = wallet.wallet_id;
    let queued = tokio::spawn(async move { wallets.withdraw(wallet_id, dec!(60.00)).await });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    holder
        .save_wallet(wallet.wallet_id, dec!(40.00))
        .await
        .unwrap();
    holder.commit().await.unwrap();

    let result = queued.await.unwrap();
    assert!(
        matches!(result, Err(WalletError::InsufficientFunds { available, .. }) if available == dec!(40.00)),
        "Queued withdrawal must see the committed balance, got {result:?}"
    );
}
