//! Sync error types.

use finsync_core::ledger::LedgerError;
use finsync_core::sync::FetchError;
use finsync_db::StoreError;
use finsync_shared::AppError;
use finsync_shared::types::LinkedItemId;
use thiserror::Error;

/// Errors raised by the reconciler, the linker and webhook handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Provider call failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Store read or commit failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Ledger mutation refused.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// No local account is linked to the provider account.
    #[error("No account linked to provider account {0}")]
    AccountNotFound(String),

    /// Linked item not found by id.
    #[error("Linked item not found: {0}")]
    ItemNotFound(LinkedItemId),

    /// Linked item not found by provider item id.
    #[error("Linked item not found for provider item {0}")]
    ProviderItemNotFound(String),

    /// Fixture file could not be read or parsed.
    #[error("Invalid fixture: {0}")]
    Fixture(String),
}

impl SyncError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::ItemNotFound(_) | Self::ProviderItemNotFound(_) => "LINKED_ITEM_NOT_FOUND",
            Self::Fixture(_) => "INVALID_FIXTURE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Fetch(_) => 502,
            Self::Ledger(e) => e.http_status_code(),
            Self::AccountNotFound(_) | Self::ItemNotFound(_) | Self::ProviderItemNotFound(_) => 404,
            Self::Store(StoreError::DuplicateExternalId(_)) => 409,
            Self::Store(_) | Self::Fixture(_) => 500,
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::Fetch(e) => e.into(),
            SyncError::Store(e) => e.into(),
            SyncError::Ledger(e) => e.into(),
            SyncError::AccountNotFound(_)
            | SyncError::ItemNotFound(_)
            | SyncError::ProviderItemNotFound(_) => Self::NotFound(message),
            SyncError::Fixture(_) => Self::Configuration(message),
        }
    }
}
