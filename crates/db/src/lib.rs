//! Storage layer: repositories, an in-memory store and the ledger service.
//!
//! This crate provides:
//! - Repository abstractions for accounts, transactions and linked items
//! - An in-memory key-indexed store with atomic change-set commits
//! - Per-account locking and the atomic `LedgerService`

pub mod error;
pub mod ledger;
pub mod locks;
pub mod memory;
pub mod repositories;

pub use error::StoreError;
pub use ledger::LedgerService;
pub use locks::KeyedLocks;
pub use memory::InMemoryStore;
pub use repositories::{
    AccountRepository, ChangeSet, LedgerStore, LinkedItemRepository, TransactionRepository,
};
