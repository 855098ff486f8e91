//! Seed data for local runs: accounts, linked items and scripted provider pages.

use std::collections::HashMap;
use std::path::Path;

use finsync_core::ledger::AccountKind;
use finsync_core::sync::{AccessToken, LinkedItem};
use finsync_db::{ChangeSet, LedgerService, LedgerStore};
use finsync_shared::types::UserId;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::error::SyncError;
use crate::replay::{ReplayFeedClient, ReplayScript};

/// A manually managed account.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAccount {
    /// Owner.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Kind of account.
    pub kind: AccountKind,
    /// Opening balance.
    #[serde(default)]
    pub opening_balance: Decimal,
}

/// A provider connection.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureItem {
    /// Provider item id.
    pub provider_item_id: String,
    /// Owner of the item and its accounts.
    pub owner_id: UserId,
    /// Access credential; also the key into `feeds`.
    pub access_token: String,
    /// Institution display name.
    #[serde(default)]
    pub institution_name: Option<String>,
}

/// Fixture file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    /// Accounts opened directly.
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
    /// Linked items.
    #[serde(default)]
    pub items: Vec<FixtureItem>,
    /// Provider scripts keyed by access token.
    #[serde(default)]
    pub feeds: HashMap<String, ReplayScript>,
}

impl Fixture {
    /// Reads a JSON fixture file.
    ///
    /// # Errors
    ///
    /// Returns `Fixture` if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parses fixture JSON.
    ///
    /// # Errors
    ///
    /// Returns `Fixture` if the JSON does not match the fixture layout.
    pub fn from_json(raw: &str) -> Result<Self, SyncError> {
        serde_json::from_str(raw).map_err(|e| SyncError::Fixture(e.to_string()))
    }

    /// Writes accounts and items into the ledger and returns a feed client
    /// replaying the scripted pages.
    ///
    /// # Errors
    ///
    /// Returns a ledger error for an invalid opening balance, or a store error.
    pub async fn seed<S: LedgerStore>(
        &self,
        ledger: &LedgerService<S>,
    ) -> Result<ReplayFeedClient, SyncError> {
        for account in &self.accounts {
            ledger
                .open_account(
                    account.owner_id,
                    &account.name,
                    account.kind,
                    account.opening_balance,
                )
                .await?;
        }

        let mut changes = ChangeSet::new();
        for entry in &self.items {
            let mut item = LinkedItem::new(
                entry.provider_item_id.clone(),
                entry.owner_id,
                AccessToken::new(entry.access_token.clone()),
            );
            item.institution_name.clone_from(&entry.institution_name);
            changes = changes.item(item);
        }
        ledger.store().commit(changes).await?;

        let client = ReplayFeedClient::new();
        for (token, script) in &self.feeds {
            client.script(token, script.clone());
        }

        info!(
            accounts = self.accounts.len(),
            items = self.items.len(),
            feeds = self.feeds.len(),
            "Fixture seeded"
        );
        Ok(client)
    }
}
