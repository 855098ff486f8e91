//! Ledger engine: applies transactions to account balances.
//!
//! Every function here is pure. It takes the current account state and returns
//! the next one, or the reason the mutation is refused. Persisting the result
//! atomically is the caller's job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::account::Account;
use super::error::LedgerError;
use super::transaction::{LegDirection, Transaction, TransactionType};

/// Both accounts and both legs of a checked transfer.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    /// Source account after the debit leg.
    pub source: Account,
    /// Target account after the credit leg.
    pub target: Account,
    /// Leg recorded on the source account.
    pub debit: Transaction,
    /// Leg recorded on the target account.
    pub credit: Transaction,
}

/// Ledger engine. The only code allowed to compute a new balance.
pub struct LedgerEngine;

impl LedgerEngine {
    /// Applies a transaction to its owning account.
    ///
    /// # Errors
    ///
    /// - `InsufficientFunds` when an expense or debit leg exceeds the balance.
    /// - `BalanceOverflow` when the new balance does not fit in a decimal.
    /// - `InvalidType` when the record does not belong to the account or is a
    ///   transfer without a transfer reference.
    pub fn apply(account: &Account, tx: &Transaction) -> Result<Account, LedgerError> {
        Self::ensure_owner(account, tx)?;
        match tx.transaction_type {
            TransactionType::Income => Self::credit(account, tx.amount.abs()),
            TransactionType::Expense => Self::debit(account, tx.amount.abs()),
            TransactionType::Transfer => match tx.leg_direction()? {
                LegDirection::Debit => Self::debit(account, tx.amount.abs()),
                LegDirection::Credit => Self::credit(account, tx.amount.abs()),
            },
        }
    }

    /// Reverses the effect of a previously applied transaction.
    ///
    /// Retracting income (or a credit leg) takes money out again, so it can
    /// fail with `InsufficientFunds` if the balance was spent meanwhile.
    ///
    /// # Errors
    ///
    /// Same as [`LedgerEngine::apply`].
    pub fn retract(account: &Account, tx: &Transaction) -> Result<Account, LedgerError> {
        Self::ensure_owner(account, tx)?;
        let delta = -Self::effect(tx)?;
        Self::shift(account, delta)
    }

    /// Replaces the effect of `old` with the effect of `new` in one check.
    ///
    /// Only the net difference is validated, so changing an expense from 50 to
    /// 70 needs 20 of headroom, not 70.
    ///
    /// # Errors
    ///
    /// Same as [`LedgerEngine::apply`].
    pub fn reapply(
        account: &Account,
        old: &Transaction,
        new: &Transaction,
    ) -> Result<Account, LedgerError> {
        Self::ensure_owner(account, old)?;
        Self::ensure_owner(account, new)?;
        let delta = Self::effect(new)?
            .checked_sub(Self::effect(old)?)
            .ok_or(LedgerError::BalanceOverflow(account.id))?;
        Self::shift(account, delta)
    }

    /// Plans a transfer between two accounts.
    ///
    /// The source is checked first; the target is only credited once the debit
    /// leg is known to be valid. Neither account is returned unless both legs
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` for the source account.
    pub fn plan_transfer(
        source: &Account,
        target: &Account,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Result<TransferPlan, LedgerError> {
        let (debit, credit) = Transaction::transfer_legs(source.id, target.id, amount, occurred_at);
        let source = Self::apply(source, &debit)?;
        let target = Self::apply(target, &credit)?;
        Ok(TransferPlan {
            source,
            target,
            debit,
            credit,
        })
    }

    /// Signed balance effect of a transaction on its owning account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidType` for a transfer without a transfer reference.
    pub fn effect(tx: &Transaction) -> Result<Decimal, LedgerError> {
        let magnitude = tx.amount.abs();
        match tx.transaction_type {
            TransactionType::Income => Ok(magnitude),
            TransactionType::Expense => Ok(-magnitude),
            TransactionType::Transfer => match tx.leg_direction()? {
                LegDirection::Debit => Ok(-magnitude),
                LegDirection::Credit => Ok(magnitude),
            },
        }
    }

    fn credit(account: &Account, amount: Decimal) -> Result<Account, LedgerError> {
        let balance = account
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(account.id))?;
        Ok(Self::with_balance(account, balance))
    }

    fn debit(account: &Account, amount: Decimal) -> Result<Account, LedgerError> {
        if amount > account.balance {
            return Err(LedgerError::InsufficientFunds {
                account_id: account.id,
                balance: account.balance,
                requested: amount,
            });
        }
        let balance = account
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::BalanceOverflow(account.id))?;
        Ok(Self::with_balance(account, balance))
    }

    fn shift(account: &Account, delta: Decimal) -> Result<Account, LedgerError> {
        if delta.is_sign_negative() {
            Self::debit(account, -delta)
        } else {
            Self::credit(account, delta)
        }
    }

    fn with_balance(account: &Account, balance: Decimal) -> Account {
        Account {
            balance,
            updated_at: Utc::now(),
            ..account.clone()
        }
    }

    fn ensure_owner(account: &Account, tx: &Transaction) -> Result<(), LedgerError> {
        if tx.account_id != account.id {
            return Err(LedgerError::InvalidType(format!(
                "transaction {} belongs to account {}, not {}",
                tx.id, tx.account_id, account.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsync_shared::types::UserId;
    use rust_decimal_macros::dec;

    use crate::ledger::account::AccountKind;
    use crate::ledger::transaction::Category;
    use crate::ledger::types::{Posting, ValidatedTransaction};

    fn account(balance: Decimal) -> Account {
        Account::new(UserId::new(), "Checking", AccountKind::Checking, balance)
    }

    fn single(account: &Account, posting: Posting, amount: Decimal) -> Transaction {
        Transaction::from_validated(&ValidatedTransaction {
            account_id: account.id,
            amount,
            posting,
            category: None,
            description: None,
            merchant: None,
            occurred_at: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn test_income_adds() {
        let acc = account(dec!(100));
        let tx = single(&acc, Posting::Income, dec!(25.50));
        let updated = LedgerEngine::apply(&acc, &tx).unwrap();
        assert_eq!(updated.balance, dec!(125.50));
        assert_eq!(tx.category, Category::OtherIncome);
    }

    #[test]
    fn test_expense_within_balance() {
        let acc = account(dec!(100));
        let tx = single(&acc, Posting::Expense, dec!(100));
        let updated = LedgerEngine::apply(&acc, &tx).unwrap();
        assert_eq!(updated.balance, dec!(0));
    }

    #[test]
    fn test_expense_over_balance_fails() {
        let acc = account(dec!(100));
        let tx = single(&acc, Posting::Expense, dec!(100.01));
        let err = LedgerEngine::apply(&acc, &tx).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { balance, requested, .. }
                if balance == dec!(100) && requested == dec!(100.01)
        ));
    }

    #[test]
    fn test_transfer_leg_without_reference_is_invalid() {
        let source = account(dec!(100));
        let target = account(dec!(0));
        let (mut debit, _) =
            Transaction::transfer_legs(source.id, target.id, dec!(10), Utc::now());
        debit.transfer_id = None;
        assert!(matches!(
            LedgerEngine::apply(&source, &debit),
            Err(LedgerError::InvalidType(_))
        ));
    }

    #[test]
    fn test_foreign_transaction_is_invalid() {
        let acc = account(dec!(100));
        let other = account(dec!(100));
        let tx = single(&other, Posting::Income, dec!(1));
        assert!(matches!(
            LedgerEngine::apply(&acc, &tx),
            Err(LedgerError::InvalidType(_))
        ));
    }

    #[test]
    fn test_transfer_insufficient_leaves_both() {
        let source = account(dec!(100));
        let target = account(dec!(0));
        let result = LedgerEngine::plan_transfer(&source, &target, dec!(150), Utc::now());
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(source.balance, dec!(100));
        assert_eq!(target.balance, dec!(0));
    }

    #[test]
    fn test_transfer_moves_funds() {
        let source = account(dec!(100));
        let target = account(dec!(0));
        let plan = LedgerEngine::plan_transfer(&source, &target, dec!(40), Utc::now()).unwrap();
        assert_eq!(plan.source.balance, dec!(60));
        assert_eq!(plan.target.balance, dec!(40));
        assert_eq!(plan.debit.transfer_id, plan.credit.transfer_id);
        assert_eq!(plan.debit.account_id, source.id);
        assert_eq!(plan.credit.account_id, target.id);
    }

    #[test]
    fn test_retract_restores_balance() {
        let acc = account(dec!(100));
        let tx = single(&acc, Posting::Expense, dec!(30));
        let applied = LedgerEngine::apply(&acc, &tx).unwrap();
        let retracted = LedgerEngine::retract(&applied, &tx).unwrap();
        assert_eq!(retracted.balance, dec!(100));
    }

    #[test]
    fn test_retract_spent_income_fails() {
        let acc = account(dec!(0));
        let income = single(&acc, Posting::Income, dec!(50));
        let mut applied = LedgerEngine::apply(&acc, &income).unwrap();
        applied.balance = dec!(10);
        assert!(matches!(
            LedgerEngine::retract(&applied, &income),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_reapply_checks_net_delta() {
        let acc = account(dec!(70));
        let old = single(&acc, Posting::Expense, dec!(50));
        let after_old = LedgerEngine::apply(&acc, &old).unwrap();
        assert_eq!(after_old.balance, dec!(20));

        let mut new = old.clone();
        new.amount = dec!(70);
        let after_new = LedgerEngine::reapply(&after_old, &old, &new).unwrap();
        assert_eq!(after_new.balance, dec!(0));

        new.amount = dec!(70.01);
        assert!(LedgerEngine::reapply(&after_old, &old, &new).is_err());
    }

    #[test]
    fn test_reapply_type_flip() {
        let acc = account(dec!(100));
        let old = single(&acc, Posting::Expense, dec!(10));
        let after_old = LedgerEngine::apply(&acc, &old).unwrap();

        let mut new = old.clone();
        new.transaction_type = TransactionType::Income;
        let after_new = LedgerEngine::reapply(&after_old, &old, &new).unwrap();
        assert_eq!(after_new.balance, dec!(110));
    }

    #[test]
    fn test_income_overflow_is_rejected() {
        let acc = account(Decimal::MAX);
        let tx = single(&acc, Posting::Income, Decimal::ONE);
        assert!(matches!(
            LedgerEngine::apply(&acc, &tx),
            Err(LedgerError::BalanceOverflow(id)) if id == acc.id
        ));
    }

    #[test]
    fn test_reapply_overflowing_delta_is_rejected() {
        let acc = account(Decimal::MAX);
        let old = single(&acc, Posting::Expense, Decimal::MAX);
        let mut new = old.clone();
        new.transaction_type = TransactionType::Income;
        assert!(matches!(
            LedgerEngine::reapply(&acc, &old, &new),
            Err(LedgerError::BalanceOverflow(_))
        ));
    }
}
