//! Concurrent access tests for ledger mutations.
//!
//! These tests verify that:
//! - Concurrent expenses against one account never overdraw it
//! - The final balance equals the initial balance minus the accepted expenses
//! - Opposing transfers between two accounts do not deadlock and conserve money

#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use finsync_core::ledger::{AccountKind, CreateTransactionRequest, LedgerError, TransactionType};
use finsync_db::{InMemoryStore, LedgerService, LedgerStore, TransactionRepository};
use finsync_shared::types::{AccountId, UserId};

fn expense(account_id: AccountId, amount: Decimal) -> CreateTransactionRequest {
    CreateTransactionRequest {
        account_id: Some(account_id),
        amount: Some(amount),
        transaction_type: Some(TransactionType::Expense),
        occurred_at: Some(Utc::now()),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_expenses_never_overdraw() {
    let service = Arc::new(LedgerService::new(Arc::new(InMemoryStore::new())));
    let acc = service
        .open_account(UserId::new(), "Checking", AccountKind::Checking, dec!(100))
        .await
        .unwrap();

    let tasks = 50;
    let barrier = Arc::new(Barrier::new(tasks));
    let handles = (0..tasks).map(|_| {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            service.create_transaction(&expense(acc.id, dec!(7))).await
        })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
        .count();

    // 100 / 7 = 14 expenses fit
    assert_eq!(accepted, 14);
    assert_eq!(accepted + rejected, tasks);

    let final_balance = service.account(acc.id).await.unwrap().balance;
    assert_eq!(
        final_balance,
        dec!(100) - dec!(7) * Decimal::from(accepted as u32)
    );
    assert!(final_balance >= Decimal::ZERO);

    let stored = service
        .store()
        .transactions()
        .find_by_account(acc.id)
        .await
        .unwrap();
    assert_eq!(stored.len(), accepted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_conserve_total() {
    let service = Arc::new(LedgerService::new(Arc::new(InMemoryStore::new())));
    let owner = UserId::new();
    let a = service
        .open_account(owner, "A", AccountKind::Checking, dec!(500))
        .await
        .unwrap();
    let b = service
        .open_account(owner, "B", AccountKind::Savings, dec!(500))
        .await
        .unwrap();

    let tasks = 40;
    let barrier = Arc::new(Barrier::new(tasks));
    let handles = (0..tasks).map(|i| {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
        tokio::spawn(async move {
            barrier.wait().await;
            service
                .create_transaction(&CreateTransactionRequest {
                    account_id: Some(from),
                    target_account_id: Some(to),
                    amount: Some(dec!(25)),
                    transaction_type: Some(TransactionType::Transfer),
                    occurred_at: Some(Utc::now()),
                    ..Default::default()
                })
                .await
        })
    });

    let results = tokio::time::timeout(std::time::Duration::from_secs(10), join_all(handles))
        .await
        .expect("transfers deadlocked");
    assert!(results.iter().all(|r| matches!(r, Ok(Ok(_)))));

    let total = service.account(a.id).await.unwrap().balance
        + service.account(b.id).await.unwrap().balance;
    assert_eq!(total, dec!(1000));
}
