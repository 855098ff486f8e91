//! Normalized provider payloads and reconciliation bookkeeping types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use finsync_shared::types::{LinkedItemId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A transaction as reported by the provider, normalized at the boundary.
///
/// `amount` is signed: non-negative means money in, negative means money out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTransaction {
    /// Provider transaction id; the reconciliation key.
    pub external_id: String,
    /// Provider account id the transaction belongs to.
    pub account_external_id: String,
    /// Signed amount.
    pub amount: Decimal,
    /// Provider description.
    #[serde(default)]
    pub description: Option<String>,
    /// Merchant name, if the provider resolved one.
    #[serde(default)]
    pub merchant: Option<String>,
    /// Posting date.
    pub date: NaiveDate,
    /// Whether the provider still reports it as pending.
    #[serde(default)]
    pub pending: bool,
    /// Provider category label, if any.
    #[serde(default)]
    pub category_hint: Option<String>,
}

impl ExternalTransaction {
    /// Posting date as a UTC timestamp at the start of the day.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

/// One page of provider deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedBatch {
    /// Transactions new since the cursor.
    #[serde(default)]
    pub added: Vec<ExternalTransaction>,
    /// Transactions changed since the cursor.
    #[serde(default)]
    pub modified: Vec<ExternalTransaction>,
    /// External ids of transactions removed since the cursor.
    #[serde(default)]
    pub removed: Vec<String>,
    /// Cursor to resume from after this page.
    pub next_cursor: String,
    /// Whether another page follows.
    #[serde(default)]
    pub has_more: bool,
}

impl FeedBatch {
    /// Total number of records in the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Returns true if the page carries no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A provider account attached to a linked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAccount {
    /// Provider account id.
    pub external_id: String,
    /// Display name.
    pub name: String,
    /// Provider type ("depository", "credit", "loan", ...).
    pub account_type: String,
    /// Provider subtype ("checking", "savings", "mortgage", ...).
    #[serde(default)]
    pub subtype: Option<String>,
    /// Current balance reported by the provider.
    pub current_balance: Decimal,
}

/// Provider access credential.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw credential.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw credential for the provider call.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// One connection to the provider, with its sync cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedItem {
    /// Unique identifier.
    pub id: LinkedItemId,
    /// Provider item id (used by webhooks).
    pub provider_item_id: String,
    /// User owning the item and its accounts.
    pub owner_id: UserId,
    /// Provider access credential.
    pub access_token: AccessToken,
    /// Institution display name.
    #[serde(default)]
    pub institution_name: Option<String>,
    /// Last fully reconciled position; `None` before the first sync.
    #[serde(default)]
    pub cursor: Option<String>,
    /// When the last cycle committed.
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    /// Why the last cycle failed, cleared on commit.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl LinkedItem {
    /// Creates an item that has never been synced.
    #[must_use]
    pub fn new(
        provider_item_id: impl Into<String>,
        owner_id: UserId,
        access_token: AccessToken,
    ) -> Self {
        Self {
            id: LinkedItemId::new(),
            provider_item_id: provider_item_id.into(),
            owner_id,
            access_token,
            institution_name: None,
            cursor: None,
            last_sync: None,
            last_error: None,
        }
    }
}

/// Reconciliation cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    /// Not running.
    Idle,
    /// Waiting on the provider.
    Fetching,
    /// Applying records to the store.
    Reconciling,
    /// Cursor advanced.
    Committed,
    /// Cursor unchanged, error recorded.
    Failed,
}

impl CycleState {
    /// Returns true for `Committed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Returns true if the cycle may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Fetching)
                | (Self::Fetching, Self::Reconciling | Self::Failed)
                // next page of a paginated batch
                | (Self::Reconciling, Self::Fetching | Self::Committed | Self::Failed)
        )
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Fetching => "FETCHING",
            Self::Reconciling => "RECONCILING",
            Self::Committed => "COMMITTED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Per-cycle record counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Records created locally.
    pub added: usize,
    /// Existing records whose values changed.
    pub modified: usize,
    /// Records deleted locally.
    pub removed: usize,
    /// Records already up to date (including unknown removals).
    pub unchanged: usize,
    /// Records that failed and were skipped.
    pub skipped: usize,
}

impl CycleStats {
    /// Adds another page's counters.
    pub fn merge(&mut self, other: Self) {
        self.added += other.added;
        self.modified += other.modified;
        self.removed += other.removed;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }

    /// Total records seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.added + self.modified + self.removed + self.unchanged + self.skipped
    }
}

/// Provider notification that may trigger a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookEvent {
    /// Notification family, e.g. `TRANSACTIONS`.
    pub webhook_type: String,
    /// Notification code, e.g. `SYNC_UPDATES_AVAILABLE`.
    pub webhook_code: String,
    /// Provider item id.
    pub item_id: String,
}

impl WebhookEvent {
    /// Returns true if the notification means new transaction data is available.
    #[must_use]
    pub fn requests_sync(&self) -> bool {
        self.webhook_type.eq_ignore_ascii_case("TRANSACTIONS")
            && matches!(
                self.webhook_code.to_ascii_uppercase().as_str(),
                "DEFAULT_UPDATE" | "SYNC_UPDATES_AVAILABLE"
            )
    }
}
