//! Ledger error types.

use finsync_shared::AppError;
use finsync_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::validation::ValidationError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// The request failed structural validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ========== Business Rule Errors ==========
    /// Applying the transaction would make the balance negative.
    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The account that would be overdrawn.
        account_id: AccountId,
        /// Balance before the mutation.
        balance: Decimal,
        /// Amount the mutation tried to take out.
        requested: Decimal,
    },

    /// The new balance does not fit in a decimal.
    #[error("Balance overflow in account {0}")]
    BalanceOverflow(AccountId),

    // ========== Contract Errors ==========
    /// Unknown type text or a malformed transfer leg.
    #[error("Invalid transaction type: {0}")]
    InvalidType(String),

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Store Errors ==========
    /// A transaction with this external id already exists.
    #[error("Duplicate external transaction id: {0}")]
    DuplicateExternalId(String),

    /// Store backend error.
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::InvalidType(_) => "INVALID_TYPE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::DuplicateExternalId(_) => "DUPLICATE_EXTERNAL_ID",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::Validation(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict - uniqueness
            Self::DuplicateExternalId(_) => 409,

            // 422 Unprocessable - business rule
            Self::InsufficientFunds { .. } | Self::BalanceOverflow(_) => 422,

            // 500 Internal Server Error
            Self::InvalidType(_) | Self::Store(_) => 500,
        }
    }

    /// Returns true if this error may succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Validation(_) => Self::Validation(message),
            LedgerError::InsufficientFunds { .. } | LedgerError::BalanceOverflow(_) => {
                Self::BusinessRule(message)
            }
            LedgerError::AccountNotFound(_) | LedgerError::TransactionNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::DuplicateExternalId(_) => Self::Conflict(message),
            LedgerError::Store(_) => Self::Storage(message),
            LedgerError::InvalidType(_) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::InvalidType("X".to_string()).error_code(),
            "INVALID_TYPE"
        );
        assert_eq!(
            LedgerError::Validation(ValidationError::MissingAmount).error_code(),
            "MISSING_AMOUNT"
        );
        assert_eq!(
            LedgerError::AccountNotFound(AccountId::new()).error_code(),
            "ACCOUNT_NOT_FOUND"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            LedgerError::Validation(ValidationError::MissingType).http_status_code(),
            400
        );
        assert_eq!(
            LedgerError::InsufficientFunds {
                account_id: AccountId::new(),
                balance: dec!(10),
                requested: dec!(20),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            LedgerError::TransactionNotFound(TransactionId::new()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::DuplicateExternalId("ext-1".into()).http_status_code(),
            409
        );
        assert_eq!(LedgerError::InvalidType("X".into()).http_status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        let id = AccountId::new();
        let err = LedgerError::InsufficientFunds {
            account_id: id,
            balance: dec!(100.00),
            requested: dec!(150.00),
        };
        assert_eq!(
            err.to_string(),
            format!(
                "Insufficient funds in account {id}: balance 100.00, requested 150.00"
            )
        );
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = LedgerError::InsufficientFunds {
            account_id: AccountId::new(),
            balance: dec!(1),
            requested: dec!(2),
        }
        .into();
        assert_eq!(app.status_code(), 422);
        assert_eq!(app.error_code(), "BUSINESS_RULE_VIOLATION");

        let app: AppError = LedgerError::Validation(ValidationError::MissingAccount).into();
        assert_eq!(app.status_code(), 400);

        let app: AppError = LedgerError::DuplicateExternalId("ext".into()).into();
        assert_eq!(app.error_code(), "CONFLICT");
        assert!(!LedgerError::InvalidType("X".into()).is_retryable());
    }
}
