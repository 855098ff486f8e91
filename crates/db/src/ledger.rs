//! Ledger service: atomic balance mutations over a [`LedgerStore`].
//!
//! Each mutation runs read, check and commit under the per-account locks of
//! every account it touches, and writes through a single change set.

use std::sync::Arc;

use finsync_core::ledger::{
    Account, AccountKind, CreateTransactionRequest, CreatedTransaction, LedgerEngine, LedgerError,
    Posting, Transaction, TransactionFilter, validate, validate_opening_balance,
};
use finsync_shared::types::{AccountId, TransactionId, UserId};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::locks::KeyedLocks;
use crate::repositories::{AccountRepository, ChangeSet, LedgerStore, TransactionRepository};

/// Atomic ledger operations.
#[derive(Debug)]
pub struct LedgerService<S> {
    store: Arc<S>,
    locks: KeyedLocks<AccountId>,
}

impl<S: LedgerStore> LedgerService<S> {
    /// Creates a service over a store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Opens an account with a non-negative opening balance.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative balance, or a store error.
    pub async fn open_account(
        &self,
        owner_id: UserId,
        name: &str,
        kind: AccountKind,
        opening_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let balance = validate_opening_balance(opening_balance)?;
        let account = Account::new(owner_id, name, kind, balance);
        self.store
            .commit(ChangeSet::new().open(account.clone()))
            .await?;
        info!(account_id = %account.id, owner_id = %owner_id, "Account opened");
        Ok(account)
    }

    /// Opens an account linked to a provider account.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative balance, or a store error
    /// if the provider account is already linked.
    pub async fn open_linked_account(
        &self,
        owner_id: UserId,
        name: &str,
        kind: AccountKind,
        opening_balance: Decimal,
        external_account_id: &str,
    ) -> Result<Account, LedgerError> {
        let balance = validate_opening_balance(opening_balance)?;
        let account = Account::new(owner_id, name, kind, balance).linked_to(external_account_id);
        self.store
            .commit(ChangeSet::new().open(account.clone()))
            .await?;
        info!(
            account_id = %account.id,
            external_account_id = %external_account_id,
            "Linked account opened"
        );
        Ok(account)
    }

    /// Changes an account's display name. The balance is untouched.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn rename_account(&self, id: AccountId, name: &str) -> Result<Account, LedgerError> {
        let _guard = self.locks.lock(id).await;
        let mut account = self.load_account(id).await?;
        if account.name != name {
            account.name = name.to_string();
            account.updated_at = chrono::Utc::now();
            self.store
                .commit(ChangeSet::new().update(account.clone()))
                .await?;
        }
        Ok(account)
    }

    /// Validates and applies a client request.
    ///
    /// A transfer debits the source and credits the target in one commit; if
    /// either side fails, nothing is written.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed requests.
    /// - `AccountNotFound` for a missing source or target account.
    /// - `InsufficientFunds` if the debited account would go negative.
    pub async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<CreatedTransaction, LedgerError> {
        let input = validate(request)?;

        match input.posting {
            Posting::Income | Posting::Expense => {
                let _guard = self.locks.lock(input.account_id).await;
                let account = self.load_account(input.account_id).await?;
                let tx = Transaction::from_validated(&input)?;
                let updated = LedgerEngine::apply(&account, &tx)?;

                self.store
                    .commit(ChangeSet::new().update(updated).save(tx.clone()))
                    .await?;
                info!(
                    account_id = %tx.account_id,
                    transaction_id = %tx.id,
                    transaction_type = %tx.transaction_type,
                    amount = %tx.amount,
                    "Transaction created"
                );
                Ok(CreatedTransaction::Single(tx))
            }
            Posting::Transfer { target } => {
                let _guards = self.locks.lock_many(&[input.account_id, target]).await;
                let source = self.load_account(input.account_id).await?;
                let target = self.load_account(target).await?;

                let plan =
                    LedgerEngine::plan_transfer(&source, &target, input.amount, input.occurred_at)?;

                let changes = ChangeSet::new()
                    .update(plan.source)
                    .update(plan.target)
                    .save(plan.debit.clone())
                    .save(plan.credit.clone());
                self.store.commit(changes).await?;

                info!(
                    source_account_id = %source.id,
                    target_account_id = %target.id,
                    amount = %input.amount,
                    "Transfer created"
                );
                Ok(CreatedTransaction::Transfer {
                    debit: plan.debit,
                    credit: plan.credit,
                })
            }
        }
    }

    /// Inserts a provider-sourced record and applies its balance effect.
    ///
    /// # Errors
    ///
    /// - `DuplicateExternalId` if the external id is already stored.
    /// - `AccountNotFound` if the owning account is missing.
    /// - `InsufficientFunds` if the record would overdraw the account.
    pub async fn record_external(&self, tx: Transaction) -> Result<Transaction, LedgerError> {
        let _guard = self.locks.lock(tx.account_id).await;

        if let Some(external_id) = tx.external_id.as_deref()
            && self
                .store
                .transactions()
                .find_by_external_id(external_id)
                .await?
                .is_some()
        {
            return Err(LedgerError::DuplicateExternalId(external_id.to_string()));
        }

        let account = self.load_account(tx.account_id).await?;
        let updated = LedgerEngine::apply(&account, &tx)?;
        self.store
            .commit(ChangeSet::new().update(updated).save(tx.clone()))
            .await?;
        debug!(
            transaction_id = %tx.id,
            account_id = %tx.account_id,
            "External transaction recorded"
        );
        Ok(tx)
    }

    /// Replaces a stored record, moving the balance by the net difference.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if no record has this id.
    /// - `InvalidType` if the revision moves the record to another account.
    /// - `InsufficientFunds` if the new effect would overdraw the account.
    pub async fn revise(&self, revised: Transaction) -> Result<Transaction, LedgerError> {
        let _guard = self.locks.lock(revised.account_id).await;
        let existing = self.load_transaction(revised.id).await?;
        if existing.account_id != revised.account_id {
            return Err(LedgerError::InvalidType(format!(
                "transaction {} cannot move from account {} to {}",
                existing.id, existing.account_id, revised.account_id
            )));
        }

        let account = self.load_account(existing.account_id).await?;
        let updated = LedgerEngine::reapply(&account, &existing, &revised)?;
        self.store
            .commit(ChangeSet::new().update(updated).save(revised.clone()))
            .await?;
        debug!(
            transaction_id = %revised.id,
            old_amount = %existing.amount,
            new_amount = %revised.amount,
            "Transaction revised"
        );
        Ok(revised)
    }

    /// Deletes a record and reverses its effect.
    ///
    /// Removing one leg of a transfer removes both legs.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if no record has this id.
    /// - `InsufficientFunds` if reversing would overdraw an account.
    pub async fn remove(&self, id: TransactionId) -> Result<Vec<Transaction>, LedgerError> {
        let first = self.load_transaction(id).await?;
        let mut keys = vec![first.account_id];
        keys.extend(first.counterpart_account_id);
        let _guards = self.locks.lock_many(&keys).await;

        // re-read under the locks
        let tx = self.load_transaction(id).await?;
        let mut legs = vec![tx.clone()];
        if let (Some(transfer_id), Some(counterpart)) = (tx.transfer_id, tx.counterpart_account_id)
        {
            let other = self
                .store
                .transactions()
                .find_by_account(counterpart)
                .await?
                .into_iter()
                .find(|leg| leg.transfer_id == Some(transfer_id) && leg.id != tx.id);
            legs.extend(other);
        }

        let mut changes = ChangeSet::new();
        for leg in &legs {
            let account = self.load_account(leg.account_id).await?;
            changes = changes
                .update(LedgerEngine::retract(&account, leg)?)
                .delete(leg.id);
        }
        self.store.commit(changes).await?;

        info!(transaction_id = %id, legs = legs.len(), "Transaction removed");
        Ok(legs)
    }

    /// Clears the pending flag. No balance effect.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if no record has this id.
    pub async fn confirm(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let tx = self.load_transaction(id).await?;
        let _guard = self.locks.lock(tx.account_id).await;

        let mut tx = self.load_transaction(id).await?;
        if tx.pending {
            tx.pending = false;
            tx.updated_at = chrono::Utc::now();
            self.store.commit(ChangeSet::new().save(tx.clone())).await?;
            debug!(transaction_id = %id, "Transaction confirmed");
        }
        Ok(tx)
    }

    /// Finds an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.load_account(id).await
    }

    /// Transactions of one account matching a filter, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn transactions_for_account(
        &self,
        account_id: AccountId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.load_account(account_id).await?;
        let transactions = self.store.transactions().find_by_account(account_id).await?;
        Ok(transactions
            .into_iter()
            .filter(|tx| filter.matches(tx))
            .collect())
    }

    /// Transactions across every account of an owner matching a filter.
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    pub async fn transactions_for_owner(
        &self,
        owner_id: UserId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut all = Vec::new();
        for account in self.store.accounts().find_by_owner(owner_id).await? {
            let transactions = self.store.transactions().find_by_account(account.id).await?;
            all.extend(transactions.into_iter().filter(|tx| filter.matches(tx)));
        }
        all.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    /// Pending transactions across every account of an owner.
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    pub async fn pending_for_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let all = self
            .transactions_for_owner(owner_id, &TransactionFilter::default())
            .await?;
        Ok(all.into_iter().filter(|tx| tx.pending).collect())
    }

    async fn load_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .accounts()
            .find_by_id(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn load_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.store
            .transactions()
            .find_by_id(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }
}
