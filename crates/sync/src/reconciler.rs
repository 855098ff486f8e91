//! Sync reconciler: one cycle per linked item, and the sweep over all items.
//!
//! A cycle moves `IDLE -> FETCHING -> RECONCILING -> {COMMITTED, FAILED}`,
//! looping back to `FETCHING` while the provider reports more pages. The item
//! cursor is persisted only after the last page is reconciled, so an
//! abandoned or failed cycle is redelivered from the old cursor next time.

use std::sync::Arc;

use chrono::Utc;
use finsync_core::ledger::LedgerError;
use finsync_core::sync::{
    CycleState, CycleStats, ExternalTransaction, FeedBatch, FetchError, LinkedItem, revised,
    to_record,
};
use finsync_db::{
    AccountRepository, ChangeSet, KeyedLocks, LedgerService, LedgerStore, LinkedItemRepository,
    TransactionRepository,
};
use finsync_shared::types::LinkedItemId;
use futures::{StreamExt, stream};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::client::FeedClient;
use crate::error::SyncError;
use crate::linker::AccountLinker;

const DEFAULT_MAX_CONCURRENT_ITEMS: usize = 4;

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleOutcome {
    /// Every page was reconciled and the cursor advanced.
    Committed {
        /// Record counters across all pages.
        stats: CycleStats,
        /// Cursor now stored on the item.
        cursor: String,
    },
    /// Fetching or linking failed; the cursor is unchanged.
    Failed {
        /// Error text, also stored on the item.
        reason: String,
    },
}

impl CycleOutcome {
    /// Returns true for a committed cycle.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Result of a sweep over every linked item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Number of items whose cycle committed.
    pub committed: usize,
    /// Items whose cycle failed, with the reason.
    pub failed: Vec<(LinkedItemId, String)>,
    /// Record counters summed over committed cycles.
    pub stats: CycleStats,
}

/// What happened to a single provider record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Added,
    Modified,
    Removed,
    Unchanged,
}

/// Tracks and logs the state of one cycle.
struct Cycle {
    item_id: LinkedItemId,
    state: CycleState,
}

impl Cycle {
    const fn new(item_id: LinkedItemId) -> Self {
        Self {
            item_id,
            state: CycleState::Idle,
        }
    }

    fn advance(&mut self, next: CycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal cycle transition {} -> {next}",
            self.state
        );
        debug!(item_id = %self.item_id, from = %self.state, to = %next, "Cycle transition");
        self.state = next;
    }
}

/// Reconciles provider deltas into the ledger.
pub struct SyncReconciler<S, C> {
    ledger: Arc<LedgerService<S>>,
    client: C,
    item_locks: KeyedLocks<LinkedItemId>,
    max_concurrent_items: usize,
}

impl<S: LedgerStore, C: FeedClient> SyncReconciler<S, C> {
    /// Creates a reconciler over a ledger and a feed client.
    #[must_use]
    pub fn new(ledger: Arc<LedgerService<S>>, client: C) -> Self {
        Self {
            ledger,
            client,
            item_locks: KeyedLocks::new(),
            max_concurrent_items: DEFAULT_MAX_CONCURRENT_ITEMS,
        }
    }

    /// Sets how many items a sweep reconciles at the same time (at least one).
    #[must_use]
    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max.max(1);
        self
    }

    /// The ledger this reconciler writes through.
    #[must_use]
    pub fn ledger(&self) -> &Arc<LedgerService<S>> {
        &self.ledger
    }

    /// The feed client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs one reconciliation cycle for an item.
    ///
    /// Provider and account-linking failures are not errors here: they end the
    /// cycle as [`CycleOutcome::Failed`] with the reason recorded on the item.
    /// Failures of single records are logged and counted as skipped.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if the item does not exist.
    /// - A store error if the item itself cannot be read or saved.
    pub async fn run_cycle(&self, item_id: LinkedItemId) -> Result<CycleOutcome, SyncError> {
        let _guard = self.item_locks.lock(item_id).await;

        let mut item = self
            .ledger
            .store()
            .items()
            .find_by_id(item_id)
            .await?
            .ok_or(SyncError::ItemNotFound(item_id))?;

        let mut cycle = Cycle::new(item_id);
        cycle.advance(CycleState::Fetching);

        match self.fetch_and_reconcile(&item, &mut cycle).await {
            Ok((stats, cursor)) => {
                item.cursor = Some(cursor.clone());
                item.last_sync = Some(Utc::now());
                item.last_error = None;
                self.ledger
                    .store()
                    .commit(ChangeSet::new().item(item))
                    .await?;
                cycle.advance(CycleState::Committed);

                info!(
                    item_id = %item_id,
                    added = stats.added,
                    modified = stats.modified,
                    removed = stats.removed,
                    unchanged = stats.unchanged,
                    skipped = stats.skipped,
                    "Sync cycle committed"
                );
                Ok(CycleOutcome::Committed { stats, cursor })
            }
            Err(e) => {
                let reason = e.to_string();
                item.last_error = Some(reason.clone());
                self.ledger
                    .store()
                    .commit(ChangeSet::new().item(item))
                    .await?;
                cycle.advance(CycleState::Failed);

                error!(item_id = %item_id, error = %e, "Sync cycle failed");
                Ok(CycleOutcome::Failed { reason })
            }
        }
    }

    /// Runs one cycle for every linked item.
    ///
    /// Items run concurrently up to the configured bound. A failing item is
    /// reported and never stops the others.
    ///
    /// # Errors
    ///
    /// Returns a store error only if the item list cannot be read.
    pub async fn sweep(&self) -> Result<SweepReport, SyncError> {
        let items = self.ledger.store().items().list().await?;
        info!(items = items.len(), "Sync sweep started");

        let results: Vec<_> = stream::iter(items.into_iter().map(|item| item.id))
            .map(|id| async move { (id, self.run_cycle(id).await) })
            .buffer_unordered(self.max_concurrent_items)
            .collect()
            .await;

        self.item_locks.prune();

        let mut report = SweepReport::default();
        for (item_id, result) in results {
            match result {
                Ok(CycleOutcome::Committed { stats, .. }) => {
                    report.committed += 1;
                    report.stats.merge(stats);
                }
                Ok(CycleOutcome::Failed { reason }) => report.failed.push((item_id, reason)),
                Err(e) => {
                    error!(item_id = %item_id, error = %e, "Sync cycle aborted");
                    report.failed.push((item_id, e.to_string()));
                }
            }
        }

        info!(
            committed = report.committed,
            failed = report.failed.len(),
            "Sync sweep finished"
        );
        Ok(report)
    }

    /// Links accounts, then fetches and reconciles every page.
    ///
    /// Any error returned here ends the cycle as `Failed` with the cursor
    /// unchanged. Failures of single records are counted, not returned.
    async fn fetch_and_reconcile(
        &self,
        item: &LinkedItem,
        cycle: &mut Cycle,
    ) -> Result<(CycleStats, String), SyncError> {
        let accounts = self.client.fetch_accounts(&item.access_token).await?;
        let linked = AccountLinker::link(&self.ledger, item, &accounts).await?;
        if linked.created > 0 {
            info!(item_id = %item.id, created = linked.created, "New provider accounts linked");
        }

        let mut stats = CycleStats::default();
        let mut cursor = item.cursor.clone();

        loop {
            let batch = self
                .client
                .fetch_batch(&item.access_token, cursor.as_deref())
                .await?;

            if batch.has_more && cursor.as_deref() == Some(batch.next_cursor.as_str()) {
                return Err(FetchError::Malformed(format!(
                    "cursor {} did not advance although more pages were announced",
                    batch.next_cursor
                ))
                .into());
            }

            cycle.advance(CycleState::Reconciling);
            stats.merge(self.reconcile_page(item.id, &batch).await);

            let has_more = batch.has_more;
            cursor = Some(batch.next_cursor);
            if !has_more {
                break;
            }
            cycle.advance(CycleState::Fetching);
        }

        Ok((stats, cursor.unwrap_or_default()))
    }

    async fn reconcile_page(&self, item_id: LinkedItemId, batch: &FeedBatch) -> CycleStats {
        let mut stats = CycleStats::default();

        // a modified record we have never seen is created like an added one
        for ext in batch.added.iter().chain(&batch.modified) {
            let result = self.upsert(ext).await;
            Self::count(&mut stats, item_id, &ext.external_id, result);
        }
        for external_id in &batch.removed {
            let result = self.remove(external_id).await;
            Self::count(&mut stats, item_id, external_id, result);
        }

        stats
    }

    async fn upsert(&self, ext: &ExternalTransaction) -> Result<RecordOutcome, SyncError> {
        let store = self.ledger.store();

        if let Some(existing) = store
            .transactions()
            .find_by_external_id(&ext.external_id)
            .await?
        {
            let owner = store
                .accounts()
                .find_by_external_account_id(&ext.account_external_id)
                .await?;
            if let Some(account) = owner
                && account.id != existing.account_id
            {
                return Err(LedgerError::InvalidType(format!(
                    "provider moved transaction {} from account {} to {}",
                    ext.external_id, existing.account_id, account.id
                ))
                .into());
            }

            return match revised(&existing, ext) {
                Some(updated) => {
                    self.ledger.revise(updated).await?;
                    Ok(RecordOutcome::Modified)
                }
                None => Ok(RecordOutcome::Unchanged),
            };
        }

        let account = store
            .accounts()
            .find_by_external_account_id(&ext.account_external_id)
            .await?
            .ok_or_else(|| SyncError::AccountNotFound(ext.account_external_id.clone()))?;

        self.ledger
            .record_external(to_record(ext, account.id))
            .await?;
        Ok(RecordOutcome::Added)
    }

    async fn remove(&self, external_id: &str) -> Result<RecordOutcome, SyncError> {
        let Some(existing) = self
            .ledger
            .store()
            .transactions()
            .find_by_external_id(external_id)
            .await?
        else {
            return Ok(RecordOutcome::Unchanged);
        };

        self.ledger.remove(existing.id).await?;
        Ok(RecordOutcome::Removed)
    }

    fn count(
        stats: &mut CycleStats,
        item_id: LinkedItemId,
        external_id: &str,
        result: Result<RecordOutcome, SyncError>,
    ) {
        match result {
            Ok(RecordOutcome::Added) => stats.added += 1,
            Ok(RecordOutcome::Modified) => stats.modified += 1,
            Ok(RecordOutcome::Removed) => stats.removed += 1,
            Ok(RecordOutcome::Unchanged) => stats.unchanged += 1,
            Err(e) => {
                warn!(
                    item_id = %item_id,
                    external_id = %external_id,
                    error_code = e.error_code(),
                    error = %e,
                    "Skipping provider record"
                );
                stats.skipped += 1;
            }
        }
    }
}
