//! Provider feed boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use finsync_core::sync::{AccessToken, ExternalAccount, FeedBatch, FetchError};

/// Source of provider deltas for a linked item.
///
/// Implementations normalize the provider payload into [`FeedBatch`]; every
/// failure surfaces as a single [`FetchError`].
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetches the deltas after `cursor` (`None` means from the beginning).
    async fn fetch_batch(
        &self,
        access_token: &AccessToken,
        cursor: Option<&str>,
    ) -> Result<FeedBatch, FetchError>;

    /// Fetches the accounts attached to the item.
    async fn fetch_accounts(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<ExternalAccount>, FetchError>;
}

#[async_trait]
impl<T: FeedClient + ?Sized> FeedClient for Arc<T> {
    async fn fetch_batch(
        &self,
        access_token: &AccessToken,
        cursor: Option<&str>,
    ) -> Result<FeedBatch, FetchError> {
        (**self).fetch_batch(access_token, cursor).await
    }

    async fn fetch_accounts(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<ExternalAccount>, FetchError> {
        (**self).fetch_accounts(access_token).await
    }
}

/// Bounds every call of the wrapped client by a timeout.
#[derive(Debug, Clone)]
pub struct TimeoutFeedClient<C> {
    inner: C,
    limit: Duration,
}

impl<C: FeedClient> TimeoutFeedClient<C> {
    /// Wraps `inner` with a per-call time limit.
    #[must_use]
    pub const fn new(inner: C, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<C: FeedClient> FeedClient for TimeoutFeedClient<C> {
    async fn fetch_batch(
        &self,
        access_token: &AccessToken,
        cursor: Option<&str>,
    ) -> Result<FeedBatch, FetchError> {
        tokio::time::timeout(self.limit, self.inner.fetch_batch(access_token, cursor))
            .await
            .map_err(|_| FetchError::Timeout(self.limit.as_secs()))?
    }

    async fn fetch_accounts(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<ExternalAccount>, FetchError> {
        tokio::time::timeout(self.limit, self.inner.fetch_accounts(access_token))
            .await
            .map_err(|_| FetchError::Timeout(self.limit.as_secs()))?
    }
}
