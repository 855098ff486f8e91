//! Request and validated input types for ledger mutations.

use chrono::{DateTime, Utc};
use finsync_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::{Category, Transaction, TransactionType};

/// Raw request to create a transaction.
///
/// Every field is optional here; [`validate`](super::validation::validate)
/// turns it into a [`ValidatedTransaction`] or rejects it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    /// Owning (or source, for transfers) account.
    pub account_id: Option<AccountId>,
    /// Amount, expected to be strictly positive.
    pub amount: Option<Decimal>,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Category; defaults per type when absent.
    pub category: Option<Category>,
    /// Target account for transfers.
    pub target_account_id: Option<AccountId>,
    /// Free-text description.
    pub description: Option<String>,
    /// Merchant name.
    pub merchant: Option<String>,
    /// When the transaction happened.
    pub occurred_at: Option<DateTime<Utc>>,
}

/// How a validated request posts against accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posting {
    /// Credit the owning account.
    Income,
    /// Debit the owning account.
    Expense,
    /// Debit the owning account and credit `target`.
    Transfer {
        /// Account receiving the funds.
        target: AccountId,
    },
}

impl Posting {
    /// Transaction type recorded for this posting.
    #[must_use]
    pub const fn transaction_type(self) -> TransactionType {
        match self {
            Self::Income => TransactionType::Income,
            Self::Expense => TransactionType::Expense,
            Self::Transfer { .. } => TransactionType::Transfer,
        }
    }
}

/// A fully-typed request; no mandatory field can be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransaction {
    /// Owning (or source) account.
    pub account_id: AccountId,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// Posting shape.
    pub posting: Posting,
    /// Requested category, if any.
    pub category: Option<Category>,
    /// Free-text description.
    pub description: Option<String>,
    /// Merchant name.
    pub merchant: Option<String>,
    /// When the transaction happened.
    pub occurred_at: DateTime<Utc>,
}

/// Outcome of a successful `create_transaction`.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatedTransaction {
    /// A single INCOME or EXPENSE record.
    Single(Transaction),
    /// The two legs of a transfer.
    Transfer {
        /// Leg on the source account.
        debit: Transaction,
        /// Leg on the target account.
        credit: Transaction,
    },
}

impl CreatedTransaction {
    /// Returns the created records.
    #[must_use]
    pub fn records(&self) -> Vec<&Transaction> {
        match self {
            Self::Single(tx) => vec![tx],
            Self::Transfer { debit, credit } => vec![debit, credit],
        }
    }
}

/// Optional filters for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Inclusive lower bound on `occurred_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `occurred_at`.
    pub to: Option<DateTime<Utc>>,
    /// Only this type.
    pub transaction_type: Option<TransactionType>,
    /// Only this category.
    pub category: Option<Category>,
}

impl TransactionFilter {
    /// Returns true if the transaction passes every set filter.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.from.is_none_or(|from| tx.occurred_at >= from)
            && self.to.is_none_or(|to| tx.occurred_at < to)
            && self
                .transaction_type
                .is_none_or(|t| tx.transaction_type == t)
            && self.category.is_none_or(|c| tx.category == c)
    }
}
