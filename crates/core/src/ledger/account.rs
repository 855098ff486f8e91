//! Account domain type.

use chrono::{DateTime, Utc};
use finsync_shared::types::{AccountId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of financial account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Checking / current account.
    Checking,
    /// Savings account.
    Savings,
    /// Credit card or revolving credit line.
    Credit,
    /// Loan or mortgage.
    Loan,
    /// Brokerage or investment account.
    Investment,
}

impl AccountKind {
    /// Maps a provider account type (or subtype) to an account kind.
    ///
    /// Unknown provider types fall back to `Checking`.
    #[must_use]
    pub fn from_provider_type(provider_type: &str) -> Self {
        match provider_type.trim().to_lowercase().as_str() {
            "savings" => Self::Savings,
            "credit" | "credit card" => Self::Credit,
            "loan" | "mortgage" => Self::Loan,
            "investment" | "brokerage" => Self::Investment,
            // "depository", "checking" and anything unrecognised
            _ => Self::Checking,
        }
    }
}

/// A financial account holding a balance.
///
/// The balance is only ever changed by the ledger engine; everything else
/// treats it as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// User who owns the account.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Kind of account.
    pub kind: AccountKind,
    /// Current balance.
    pub balance: Decimal,
    /// Provider account id when linked to an external item.
    pub external_account_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new, unlinked account with an opening balance.
    #[must_use]
    pub fn new(
        owner_id: UserId,
        name: impl Into<String>,
        kind: AccountKind,
        opening_balance: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            owner_id,
            name: name.into(),
            kind,
            balance: opening_balance,
            external_account_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Links the account to a provider account id.
    #[must_use]
    pub fn linked_to(mut self, external_account_id: impl Into<String>) -> Self {
        self.external_account_id = Some(external_account_id.into());
        self
    }

    /// Returns true if the account is linked to a provider account.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.external_account_id.is_some()
    }
}
