//! Scripted feed client for fixtures and tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;
use finsync_core::sync::{AccessToken, ExternalAccount, FeedBatch, FetchError};
use serde::Deserialize;

use crate::client::FeedClient;

/// Cursor key used for the first page (no cursor yet).
pub const INITIAL_CURSOR: &str = "";

/// Provider responses for one access token.
///
/// `pages` is keyed by the cursor the page is requested with; the first page
/// lives under [`INITIAL_CURSOR`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    /// Accounts returned by `fetch_accounts`.
    #[serde(default)]
    pub accounts: Vec<ExternalAccount>,
    /// Pages returned by `fetch_batch`, keyed by request cursor.
    #[serde(default)]
    pub pages: HashMap<String, FeedBatch>,
}

impl ReplayScript {
    /// Adds a page served for `cursor`.
    #[must_use]
    pub fn page(mut self, cursor: Option<&str>, batch: FeedBatch) -> Self {
        self.pages
            .insert(cursor.unwrap_or(INITIAL_CURSOR).to_string(), batch);
        self
    }

    /// Adds an account.
    #[must_use]
    pub fn account(mut self, account: ExternalAccount) -> Self {
        self.accounts.push(account);
        self
    }
}

/// Feed client that replays scripted pages.
///
/// A cursor with no scripted page yields an empty batch that keeps the
/// cursor, which is how the provider reports "nothing new". Failures queued
/// with [`ReplayFeedClient::fail_next`] are returned before any page.
#[derive(Debug, Default)]
pub struct ReplayFeedClient {
    scripts: DashMap<String, ReplayScript>,
    failures: DashMap<String, VecDeque<FetchError>>,
    calls: DashMap<String, usize>,
}

impl ReplayFeedClient {
    /// Creates a client with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or replaces) the script for an access token.
    pub fn script(&self, access_token: &str, script: ReplayScript) {
        self.scripts.insert(access_token.to_string(), script);
    }

    /// Replaces the page served for `cursor` on an existing token.
    pub fn set_page(&self, access_token: &str, cursor: Option<&str>, batch: FeedBatch) {
        self.scripts
            .entry(access_token.to_string())
            .or_default()
            .pages
            .insert(cursor.unwrap_or(INITIAL_CURSOR).to_string(), batch);
    }

    /// Makes the next call for this token fail with `error`.
    pub fn fail_next(&self, access_token: &str, error: FetchError) {
        self.failures
            .entry(access_token.to_string())
            .or_default()
            .push_back(error);
    }

    /// Number of `fetch_batch` calls served for a token.
    #[must_use]
    pub fn calls(&self, access_token: &str) -> usize {
        self.calls.get(access_token).map_or(0, |c| *c)
    }

    fn take_failure(&self, access_token: &str) -> Option<FetchError> {
        self.failures
            .get_mut(access_token)
            .and_then(|mut queue| queue.pop_front())
    }

    fn unknown_token() -> FetchError {
        FetchError::Rejected {
            code: "INVALID_ACCESS_TOKEN".to_string(),
            message: "no item is linked with this access token".to_string(),
        }
    }
}

#[async_trait]
impl FeedClient for ReplayFeedClient {
    async fn fetch_batch(
        &self,
        access_token: &AccessToken,
        cursor: Option<&str>,
    ) -> Result<FeedBatch, FetchError> {
        let token = access_token.expose();
        *self.calls.entry(token.to_string()).or_default() += 1;

        if let Some(error) = self.take_failure(token) {
            return Err(error);
        }
        let script = self.scripts.get(token).ok_or_else(Self::unknown_token)?;
        let key = cursor.unwrap_or(INITIAL_CURSOR);

        Ok(script.pages.get(key).cloned().unwrap_or_else(|| FeedBatch {
            next_cursor: key.to_string(),
            ..FeedBatch::default()
        }))
    }

    async fn fetch_accounts(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<ExternalAccount>, FetchError> {
        let token = access_token.expose();
        if let Some(error) = self.take_failure(token) {
            return Err(error);
        }
        let script = self.scripts.get(token).ok_or_else(Self::unknown_token)?;
        Ok(script.accounts.clone())
    }
}
