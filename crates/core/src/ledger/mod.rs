//! Single-entry personal ledger.
//!
//! - Account and transaction types
//! - Request validation
//! - The balance engine (apply, retract, reapply, transfer planning)

pub mod account;
pub mod engine;
pub mod error;
pub mod transaction;
pub mod types;
pub mod validation;

#[cfg(test)]
mod engine_props;
#[cfg(test)]
mod validation_props;

pub use account::{Account, AccountKind};
pub use engine::{LedgerEngine, TransferPlan};
pub use error::LedgerError;
pub use transaction::{Category, LegDirection, Transaction, TransactionType};
pub use types::{
    CreateTransactionRequest, CreatedTransaction, Posting, TransactionFilter, ValidatedTransaction,
};
pub use validation::{ValidationError, validate, validate_opening_balance};
