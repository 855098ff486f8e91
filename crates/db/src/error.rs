//! Store error types.

use finsync_core::ledger::LedgerError;
use finsync_shared::AppError;
use finsync_shared::types::{AccountId, LinkedItemId, TransactionId};
use thiserror::Error;

/// Errors raised by a store when reading or committing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An updated account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// A deleted or updated transaction does not exist.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// A linked item does not exist.
    #[error("Linked item not found: {0}")]
    LinkedItemNotFound(LinkedItemId),

    /// Another transaction already carries this external id.
    #[error("Duplicate external transaction id: {0}")]
    DuplicateExternalId(String),

    /// Another account is already linked to this provider account id.
    #[error("Duplicate external account id: {0}")]
    DuplicateExternalAccountId(String),

    /// Backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::LinkedItemNotFound(_) => "LINKED_ITEM_NOT_FOUND",
            Self::DuplicateExternalId(_) => "DUPLICATE_EXTERNAL_ID",
            Self::DuplicateExternalAccountId(_) => "DUPLICATE_EXTERNAL_ACCOUNT_ID",
            Self::Backend(_) => "STORE_ERROR",
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => Self::AccountNotFound(id),
            StoreError::TransactionNotFound(id) => Self::TransactionNotFound(id),
            StoreError::DuplicateExternalId(id) => Self::DuplicateExternalId(id),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::AccountNotFound(_)
            | StoreError::TransactionNotFound(_)
            | StoreError::LinkedItemNotFound(_) => Self::NotFound(message),
            StoreError::DuplicateExternalId(_) | StoreError::DuplicateExternalAccountId(_) => {
                Self::Conflict(message)
            }
            StoreError::Backend(_) => Self::Storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_ledger_error() {
        let id = AccountId::new();
        assert!(matches!(
            LedgerError::from(StoreError::AccountNotFound(id)),
            LedgerError::AccountNotFound(found) if found == id
        ));
        assert!(matches!(
            LedgerError::from(StoreError::DuplicateExternalId("tx-1".into())),
            LedgerError::DuplicateExternalId(_)
        ));
        assert!(matches!(
            LedgerError::from(StoreError::LinkedItemNotFound(LinkedItemId::new())),
            LedgerError::Store(_)
        ));
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = StoreError::DuplicateExternalId("tx-1".into()).into();
        assert_eq!(app.status_code(), 409);
        let app: AppError = StoreError::LinkedItemNotFound(LinkedItemId::new()).into();
        assert_eq!(app.status_code(), 404);
        let app: AppError = StoreError::Backend("io".into()).into();
        assert!(app.is_retryable());
    }
}
