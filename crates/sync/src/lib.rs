//! Provider synchronization.
//!
//! This crate provides:
//! - The `FeedClient` boundary and its replay and timeout implementations
//! - The `SyncReconciler` (one cycle per linked item, plus the sweep)
//! - Account linking and webhook triggers
//! - Fixture loading for seeded runs

pub mod client;
pub mod error;
pub mod fixture;
pub mod linker;
pub mod reconciler;
pub mod replay;
pub mod webhook;

pub use client::{FeedClient, TimeoutFeedClient};
pub use error::SyncError;
pub use fixture::Fixture;
pub use linker::{AccountLinker, LinkReport};
pub use reconciler::{CycleOutcome, SweepReport, SyncReconciler};
pub use replay::{ReplayFeedClient, ReplayScript};
pub use webhook::WebhookOutcome;
