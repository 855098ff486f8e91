//! Property-based tests for the ledger engine balance rules.

use chrono::Utc;
use finsync_shared::types::UserId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::account::{Account, AccountKind};
use super::engine::LedgerEngine;
use super::error::LedgerError;
use super::transaction::Transaction;
use super::types::{Posting, ValidatedTransaction};

/// Strategy to generate non-negative balances (0.00 to 10,000.00).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn make_account(balance: Decimal) -> Account {
    Account::new(UserId::new(), "Props", AccountKind::Checking, balance)
}

fn make_tx(account: &Account, posting: Posting, amount: Decimal) -> Transaction {
    Transaction::from_validated(&ValidatedTransaction {
        account_id: account.id,
        amount,
        posting,
        category: None,
        description: None,
        merchant: None,
        occurred_at: Utc::now(),
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An expense succeeds with `balance - e` exactly when `e <= balance`.
    #[test]
    fn prop_expense_never_overdraws(start in balance(), amount in positive_amount()) {
        let account = make_account(start);
        let tx = make_tx(&account, Posting::Expense, amount);
        match LedgerEngine::apply(&account, &tx) {
            Ok(updated) => {
                prop_assert!(amount <= start);
                prop_assert_eq!(updated.balance, start - amount);
            }
            Err(LedgerError::InsufficientFunds { balance, requested, .. }) => {
                prop_assert!(amount > start);
                prop_assert_eq!(balance, start);
                prop_assert_eq!(requested, amount);
            }
            Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
        }
    }

    /// Income always succeeds with `balance + i`.
    #[test]
    fn prop_income_always_applies(start in balance(), amount in positive_amount()) {
        let account = make_account(start);
        let tx = make_tx(&account, Posting::Income, amount);
        let updated = LedgerEngine::apply(&account, &tx).unwrap();
        prop_assert_eq!(updated.balance, start + amount);
    }

    /// Applying and then retracting an accepted transaction is the identity on the balance.
    #[test]
    fn prop_retract_inverts_apply(
        start in balance(),
        amount in positive_amount(),
        is_income in any::<bool>(),
    ) {
        let account = make_account(start);
        let posting = if is_income { Posting::Income } else { Posting::Expense };
        let tx = make_tx(&account, posting, amount);
        if let Ok(applied) = LedgerEngine::apply(&account, &tx) {
            let restored = LedgerEngine::retract(&applied, &tx).unwrap();
            prop_assert_eq!(restored.balance, start);
        }
    }

    /// A transfer conserves the combined balance of both accounts.
    #[test]
    fn prop_transfer_conserves_total(
        source_balance in balance(),
        target_balance in balance(),
        amount in positive_amount(),
    ) {
        let source = make_account(source_balance);
        let target = make_account(target_balance);
        match LedgerEngine::plan_transfer(&source, &target, amount, Utc::now()) {
            Ok(plan) => {
                prop_assert_eq!(plan.source.balance + plan.target.balance, source_balance + target_balance);
                prop_assert!(plan.source.balance >= Decimal::ZERO);
            }
            Err(err) => {
                prop_assert!(amount > source_balance);
                prop_assert!(matches!(err, LedgerError::InsufficientFunds { .. }), "unexpected error: {:?}", err);
            }
        }
    }
}
