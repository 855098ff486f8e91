//! Core business logic for Finsync.
//!
//! This crate contains pure business logic with ZERO storage or I/O dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Accounts, transactions and the balance engine
//! - `sync` - Provider payloads, sync cursors and record classification
//! - `analysis` - Monthly summaries, spending trends and insights

pub mod analysis;
pub mod ledger;
pub mod sync;
