//! Provider-side domain: normalized payloads, sync cursors and the mapping
//! from provider records to ledger records.

pub mod classify;
pub mod error;
pub mod types;

pub use classify::{category_for, category_from_hint, revised, to_record, type_from_amount};
pub use error::FetchError;
pub use types::{
    AccessToken, CycleState, CycleStats, ExternalAccount, ExternalTransaction, FeedBatch,
    LinkedItem, WebhookEvent,
};
