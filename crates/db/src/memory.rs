//! In-memory key-indexed store.
//!
//! All state sits behind one `tokio` `RwLock`. A commit validates the whole
//! change set against the current state and only then applies it, while
//! holding the write guard, so readers never see half of a change set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use finsync_core::ledger::{Account, Transaction};
use finsync_core::sync::LinkedItem;
use finsync_shared::types::{AccountId, LinkedItemId, TransactionId, UserId};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::repositories::{
    AccountRepository, ChangeSet, LedgerStore, LinkedItemRepository, TransactionRepository,
};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    accounts_by_external: HashMap<String, AccountId>,
    transactions: HashMap<TransactionId, Transaction>,
    transactions_by_external: HashMap<String, TransactionId>,
    transactions_by_account: HashMap<AccountId, HashSet<TransactionId>>,
    items: HashMap<LinkedItemId, LinkedItem>,
    items_by_provider: HashMap<String, LinkedItemId>,
}

impl State {
    fn check(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let opened: HashSet<AccountId> = changes.opened.iter().map(|a| a.id).collect();
        let deleted: HashSet<TransactionId> = changes.deleted.iter().copied().collect();

        for account in &changes.accounts {
            if !self.accounts.contains_key(&account.id) && !opened.contains(&account.id) {
                return Err(StoreError::AccountNotFound(account.id));
            }
        }

        let mut external_accounts: HashMap<&str, AccountId> = HashMap::new();
        for account in changes.opened.iter().chain(&changes.accounts) {
            let Some(external) = account.external_account_id.as_deref() else {
                continue;
            };
            let taken_here = external_accounts
                .insert(external, account.id)
                .is_some_and(|other| other != account.id);
            let taken_before = self
                .accounts_by_external
                .get(external)
                .is_some_and(|other| *other != account.id);
            if taken_here || taken_before {
                return Err(StoreError::DuplicateExternalAccountId(external.to_string()));
            }
        }

        for id in &changes.deleted {
            if !self.transactions.contains_key(id) {
                return Err(StoreError::TransactionNotFound(*id));
            }
        }

        let mut external_ids: HashMap<&str, TransactionId> = HashMap::new();
        for tx in &changes.saved {
            if !self.accounts.contains_key(&tx.account_id) && !opened.contains(&tx.account_id) {
                return Err(StoreError::AccountNotFound(tx.account_id));
            }
            let Some(external) = tx.external_id.as_deref() else {
                continue;
            };
            let taken_here = external_ids
                .insert(external, tx.id)
                .is_some_and(|other| other != tx.id);
            let taken_before = self
                .transactions_by_external
                .get(external)
                .is_some_and(|other| *other != tx.id && !deleted.contains(other));
            if taken_here || taken_before {
                return Err(StoreError::DuplicateExternalId(external.to_string()));
            }
        }

        Ok(())
    }

    fn apply(&mut self, changes: ChangeSet) {
        for id in changes.deleted {
            self.remove_transaction(id);
        }
        for account in changes.opened.into_iter().chain(changes.accounts) {
            self.put_account(account);
        }
        for tx in changes.saved {
            self.put_transaction(tx);
        }
        for item in changes.items {
            self.put_item(item);
        }
    }

    fn put_account(&mut self, account: Account) {
        if let Some(previous) = self.accounts.get(&account.id)
            && let Some(external) = &previous.external_account_id
        {
            self.accounts_by_external.remove(external);
        }
        if let Some(external) = &account.external_account_id {
            self.accounts_by_external
                .insert(external.clone(), account.id);
        }
        self.accounts.insert(account.id, account);
    }

    fn put_transaction(&mut self, tx: Transaction) {
        self.remove_transaction(tx.id);
        if let Some(external) = &tx.external_id {
            self.transactions_by_external
                .insert(external.clone(), tx.id);
        }
        self.transactions_by_account
            .entry(tx.account_id)
            .or_default()
            .insert(tx.id);
        self.transactions.insert(tx.id, tx);
    }

    fn remove_transaction(&mut self, id: TransactionId) {
        let Some(tx) = self.transactions.remove(&id) else {
            return;
        };
        if let Some(external) = &tx.external_id {
            self.transactions_by_external.remove(external);
        }
        if let Some(ids) = self.transactions_by_account.get_mut(&tx.account_id) {
            ids.remove(&id);
        }
    }

    fn put_item(&mut self, item: LinkedItem) {
        if let Some(previous) = self.items.get(&item.id) {
            self.items_by_provider.remove(&previous.provider_item_id);
        }
        self.items_by_provider
            .insert(item.provider_item_id.clone(), item.id);
        self.items.insert(item.id, item);
    }
}

fn chronological(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    transactions
}

async fn commit_to(state: &RwLock<State>, changes: ChangeSet) -> Result<(), StoreError> {
    let mut guard = state.write().await;
    guard.check(&changes)?;
    guard.apply(changes);
    Ok(())
}

/// Account repository over the shared in-memory state.
#[derive(Debug, Clone)]
pub struct InMemoryAccounts {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl AccountRepository for InMemoryAccounts {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn find_by_external_account_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .accounts_by_external
            .get(external_account_id)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .state
            .read()
            .await
            .accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> =
            self.state.read().await.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    async fn save(&self, account: Account) -> Result<Account, StoreError> {
        let exists = self.state.read().await.accounts.contains_key(&account.id);
        let changes = if exists {
            ChangeSet::new().update(account.clone())
        } else {
            ChangeSet::new().open(account.clone())
        };
        commit_to(&self.state, changes).await?;
        Ok(account)
    }
}

/// Transaction repository over the shared in-memory state.
#[derive(Debug, Clone)]
pub struct InMemoryTransactions {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl TransactionRepository for InMemoryTransactions {
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .transactions_by_external
            .get(external_id)
            .and_then(|id| state.transactions.get(id))
            .cloned())
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.read().await;
        let transactions = state
            .transactions_by_account
            .get(&account_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.transactions.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(chronological(transactions))
    }

    async fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        let transactions = self
            .state
            .read()
            .await
            .transactions
            .values()
            .cloned()
            .collect();
        Ok(chronological(transactions))
    }

    async fn save(&self, transaction: Transaction) -> Result<Transaction, StoreError> {
        commit_to(&self.state, ChangeSet::new().save(transaction.clone())).await?;
        Ok(transaction)
    }

    async fn delete(&self, id: TransactionId) -> Result<(), StoreError> {
        commit_to(&self.state, ChangeSet::new().delete(id)).await
    }
}

/// Linked item repository over the shared in-memory state.
#[derive(Debug, Clone)]
pub struct InMemoryItems {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl LinkedItemRepository for InMemoryItems {
    async fn find_by_id(&self, id: LinkedItemId) -> Result<Option<LinkedItem>, StoreError> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn find_by_provider_item_id(
        &self,
        provider_item_id: &str,
    ) -> Result<Option<LinkedItem>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .items_by_provider
            .get(provider_item_id)
            .and_then(|id| state.items.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<LinkedItem>, StoreError> {
        let mut items: Vec<LinkedItem> = self.state.read().await.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn save(&self, item: LinkedItem) -> Result<LinkedItem, StoreError> {
        commit_to(&self.state, ChangeSet::new().item(item.clone())).await?;
        Ok(item)
    }
}

/// In-memory implementation of [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    accounts: InMemoryAccounts,
    transactions: InMemoryTransactions,
    items: InMemoryItems,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let state = Arc::new(RwLock::new(State::default()));
        Self {
            accounts: InMemoryAccounts {
                state: Arc::clone(&state),
            },
            transactions: InMemoryTransactions {
                state: Arc::clone(&state),
            },
            items: InMemoryItems {
                state: Arc::clone(&state),
            },
            state,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    type Accounts = InMemoryAccounts;
    type Transactions = InMemoryTransactions;
    type Items = InMemoryItems;

    fn accounts(&self) -> &Self::Accounts {
        &self.accounts
    }

    fn transactions(&self) -> &Self::Transactions {
        &self.transactions
    }

    fn items(&self) -> &Self::Items {
        &self.items
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }
        commit_to(&self.state, changes).await
    }
}
