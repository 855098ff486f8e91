//! Provider webhook handling.

use finsync_core::sync::WebhookEvent;
use finsync_db::{LedgerStore, LinkedItemRepository};
use serde::Serialize;
use tracing::info;

use crate::client::FeedClient;
use crate::error::SyncError;
use crate::reconciler::{CycleOutcome, SyncReconciler};

/// What a webhook did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookOutcome {
    /// Not a transaction update; nothing ran.
    Ignored,
    /// A cycle ran for the item.
    Triggered {
        /// Outcome of that cycle.
        cycle: CycleOutcome,
    },
}

impl<S: LedgerStore, C: FeedClient> SyncReconciler<S, C> {
    /// Runs a cycle for the item named by a transaction-update webhook.
    ///
    /// # Errors
    ///
    /// - `ProviderItemNotFound` if no item has the notified provider item id.
    /// - Any error of [`SyncReconciler::run_cycle`].
    pub async fn handle_webhook(&self, event: &WebhookEvent) -> Result<WebhookOutcome, SyncError> {
        if !event.requests_sync() {
            info!(
                webhook_type = %event.webhook_type,
                webhook_code = %event.webhook_code,
                provider_item_id = %event.item_id,
                "Webhook ignored"
            );
            return Ok(WebhookOutcome::Ignored);
        }

        let item = self
            .ledger()
            .store()
            .items()
            .find_by_provider_item_id(&event.item_id)
            .await?
            .ok_or_else(|| SyncError::ProviderItemNotFound(event.item_id.clone()))?;

        info!(item_id = %item.id, webhook_code = %event.webhook_code, "Webhook triggered sync");
        let cycle = self.run_cycle(item.id).await?;
        Ok(WebhookOutcome::Triggered { cycle })
    }
}
