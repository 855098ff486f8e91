//! Repository abstractions for data access.
//!
//! Repositories hide the storage backend from the ledger service and the
//! reconciler. Every write that touches a balance goes through
//! [`LedgerStore::commit`] as a single [`ChangeSet`].

use async_trait::async_trait;
use finsync_core::ledger::{Account, Transaction};
use finsync_core::sync::LinkedItem;
use finsync_shared::types::{AccountId, LinkedItemId, TransactionId, UserId};

use crate::error::StoreError;

/// Account lookups.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Finds an account by id.
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Finds the account linked to a provider account id.
    async fn find_by_external_account_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Lists the accounts of one owner.
    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>, StoreError>;

    /// Lists every account.
    async fn list(&self) -> Result<Vec<Account>, StoreError>;

    /// Inserts or replaces an account.
    ///
    /// Balance changes must go through the ledger service instead.
    async fn save(&self, account: Account) -> Result<Account, StoreError>;
}

/// Transaction lookups.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Finds a transaction by id.
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Finds the transaction carrying a provider transaction id.
    async fn find_by_external_id(&self, external_id: &str)
    -> Result<Option<Transaction>, StoreError>;

    /// Lists the transactions of one account, oldest first.
    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Transaction>, StoreError>;

    /// Lists every transaction, oldest first.
    async fn list(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Inserts or replaces a transaction record without touching balances.
    async fn save(&self, transaction: Transaction) -> Result<Transaction, StoreError>;

    /// Deletes a transaction record without touching balances.
    async fn delete(&self, id: TransactionId) -> Result<(), StoreError>;
}

/// Linked item lookups.
#[async_trait]
pub trait LinkedItemRepository: Send + Sync {
    /// Finds an item by id.
    async fn find_by_id(&self, id: LinkedItemId) -> Result<Option<LinkedItem>, StoreError>;

    /// Finds an item by provider item id.
    async fn find_by_provider_item_id(
        &self,
        provider_item_id: &str,
    ) -> Result<Option<LinkedItem>, StoreError>;

    /// Lists every item.
    async fn list(&self) -> Result<Vec<LinkedItem>, StoreError>;

    /// Inserts or replaces an item.
    async fn save(&self, item: LinkedItem) -> Result<LinkedItem, StoreError>;
}

/// A group of writes committed all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Accounts to insert.
    pub opened: Vec<Account>,
    /// Existing accounts to replace; each must already exist.
    pub accounts: Vec<Account>,
    /// Transactions to insert or replace.
    pub saved: Vec<Transaction>,
    /// Transactions to delete; each must exist.
    pub deleted: Vec<TransactionId>,
    /// Linked items to insert or replace.
    pub items: Vec<LinkedItem>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new account.
    #[must_use]
    pub fn open(mut self, account: Account) -> Self {
        self.opened.push(account);
        self
    }

    /// Adds an updated account.
    #[must_use]
    pub fn update(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    /// Adds a transaction to insert or replace.
    #[must_use]
    pub fn save(mut self, transaction: Transaction) -> Self {
        self.saved.push(transaction);
        self
    }

    /// Adds a transaction to delete.
    #[must_use]
    pub fn delete(mut self, id: TransactionId) -> Self {
        self.deleted.push(id);
        self
    }

    /// Adds a linked item to insert or replace.
    #[must_use]
    pub fn item(mut self, item: LinkedItem) -> Self {
        self.items.push(item);
        self
    }

    /// Returns true if there is nothing to commit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty()
            && self.accounts.is_empty()
            && self.saved.is_empty()
            && self.deleted.is_empty()
            && self.items.is_empty()
    }
}

/// A key-indexed store with an atomic commit.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Account repository type.
    type Accounts: AccountRepository;
    /// Transaction repository type.
    type Transactions: TransactionRepository;
    /// Linked item repository type.
    type Items: LinkedItemRepository;

    /// Account lookups.
    fn accounts(&self) -> &Self::Accounts;

    /// Transaction lookups.
    fn transactions(&self) -> &Self::Transactions;

    /// Linked item lookups.
    fn items(&self) -> &Self::Items;

    /// Applies every write in `changes` or none of them.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if an updated account or a transaction's owning
    ///   account does not exist.
    /// - `TransactionNotFound` if a deleted transaction does not exist.
    /// - `DuplicateExternalId` if two transactions would share an external id.
    async fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;
}
