//! Property-based tests for request validation.

use chrono::{TimeZone, Utc};
use finsync_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::transaction::TransactionType;
use super::types::{CreateTransactionRequest, Posting};
use super::validation::{ValidationError, validate};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a zero or negative amount.
fn non_positive_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

fn single_account_type() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Income), Just(TransactionType::Expense)]
}

fn make_request(amount: Decimal, transaction_type: TransactionType) -> CreateTransactionRequest {
    CreateTransactionRequest {
        account_id: Some(AccountId::new()),
        amount: Some(amount),
        transaction_type: Some(transaction_type),
        occurred_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()),
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any positive amount with a complete request validates, and the amount is kept as-is.
    #[test]
    fn prop_positive_amount_accepted(
        amount in positive_amount(),
        transaction_type in single_account_type(),
    ) {
        let request = make_request(amount, transaction_type);
        let validated = validate(&request);
        prop_assert!(validated.is_ok(), "expected ok, got {:?}", validated);
        let validated = validated.unwrap();
        prop_assert_eq!(validated.amount, amount);
        prop_assert_eq!(validated.posting.transaction_type(), transaction_type);
    }

    /// Zero and negative amounts are rejected regardless of type.
    #[test]
    fn prop_non_positive_amount_rejected(
        amount in non_positive_amount(),
        transaction_type in single_account_type(),
    ) {
        let request = make_request(amount, transaction_type);
        prop_assert_eq!(validate(&request), Err(ValidationError::NonPositiveAmount(amount)));
    }

    /// A transfer validates only with a target distinct from the source.
    #[test]
    fn prop_transfer_target_rules(amount in positive_amount(), with_target in any::<bool>()) {
        let mut request = make_request(amount, TransactionType::Transfer);
        let target = AccountId::new();
        if with_target {
            request.target_account_id = Some(target);
            prop_assert_eq!(validate(&request).map(|v| v.posting), Ok(Posting::Transfer { target }));
        } else {
            prop_assert_eq!(validate(&request), Err(ValidationError::MissingTargetAccount));
        }
    }
}
