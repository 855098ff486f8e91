//! Structural validation of transaction requests.

use rust_decimal::Decimal;
use thiserror::Error;

use super::transaction::TransactionType;
use super::types::{CreateTransactionRequest, Posting, ValidatedTransaction};

/// Validation errors for transaction requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No amount supplied.
    #[error("Amount is required")]
    MissingAmount,

    /// Amount is zero or negative.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// No transaction type supplied.
    #[error("Transaction type is required")]
    MissingType,

    /// No owning account supplied.
    #[error("Account is required")]
    MissingAccount,

    /// No occurred-at timestamp supplied.
    #[error("Occurred-at timestamp is required")]
    MissingOccurredAt,

    /// Transfer without a target account.
    #[error("Transfer requires a target account")]
    MissingTargetAccount,

    /// Transfer whose target is the source account.
    #[error("Transfer target must differ from the source account")]
    SelfTransfer,

    /// Account opened with a negative balance.
    #[error("Opening balance cannot be negative, got {0}")]
    NegativeOpeningBalance(Decimal),
}

impl ValidationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingAmount => "MISSING_AMOUNT",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::MissingType => "MISSING_TYPE",
            Self::MissingAccount => "MISSING_ACCOUNT",
            Self::MissingOccurredAt => "MISSING_OCCURRED_AT",
            Self::MissingTargetAccount => "MISSING_TARGET_ACCOUNT",
            Self::SelfTransfer => "SELF_TRANSFER",
            Self::NegativeOpeningBalance(_) => "NEGATIVE_OPENING_BALANCE",
        }
    }
}

/// Validates a raw request into a fully-typed one.
///
/// Checks run in a fixed order (amount, type, account, timestamp, transfer
/// target) so the first failure reported is deterministic.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate(
    request: &CreateTransactionRequest,
) -> Result<ValidatedTransaction, ValidationError> {
    let amount = request.amount.ok_or(ValidationError::MissingAmount)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(amount));
    }

    let transaction_type = request
        .transaction_type
        .ok_or(ValidationError::MissingType)?;
    let account_id = request.account_id.ok_or(ValidationError::MissingAccount)?;
    let occurred_at = request
        .occurred_at
        .ok_or(ValidationError::MissingOccurredAt)?;

    let posting = match transaction_type {
        TransactionType::Income => Posting::Income,
        TransactionType::Expense => Posting::Expense,
        TransactionType::Transfer => {
            let target = request
                .target_account_id
                .ok_or(ValidationError::MissingTargetAccount)?;
            if target == account_id {
                return Err(ValidationError::SelfTransfer);
            }
            Posting::Transfer { target }
        }
    };

    Ok(ValidatedTransaction {
        account_id,
        amount,
        posting,
        category: request.category,
        description: request.description.clone(),
        merchant: request.merchant.clone(),
        occurred_at,
    })
}

/// Validates an opening balance for a new account.
///
/// # Errors
///
/// Returns `NegativeOpeningBalance` for balances below zero.
pub fn validate_opening_balance(balance: Decimal) -> Result<Decimal, ValidationError> {
    if balance < Decimal::ZERO {
        return Err(ValidationError::NegativeOpeningBalance(balance));
    }
    Ok(balance)
}
