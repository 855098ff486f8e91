//! Transaction record and its closed classifications.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use finsync_shared::types::{AccountId, TransactionId, TransferId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{Posting, ValidatedTransaction};

/// Transaction type.
///
/// The set is closed: every type has exactly one evaluation arm in the
/// ledger engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money coming into the account.
    Income,
    /// Money leaving the account.
    Expense,
    /// One leg of a movement between two accounts.
    Transfer,
}

impl TransactionType {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            "TRANSFER" => Ok(Self::Transfer),
            _ => Err(LedgerError::InvalidType(s.to_string())),
        }
    }
}

/// Transaction category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    // Income
    /// Salary and wages.
    Salary,
    /// Dividends, interest and investment returns.
    Investment,
    /// Business income.
    Business,
    /// Any other income.
    OtherIncome,

    // Expense
    /// Rent, mortgage and home costs.
    Housing,
    /// Public transport, fuel, ride sharing.
    Transportation,
    /// Groceries and restaurants.
    Food,
    /// Power, water, internet, phone.
    Utilities,
    /// Medical and pharmacy.
    Healthcare,
    /// Leisure and subscriptions.
    Entertainment,
    /// General merchandise.
    Shopping,
    /// Tuition and courses.
    Education,
    /// Loan and card repayments.
    DebtPayment,
    /// Money set aside.
    Savings,
    /// Any other expense.
    OtherExpense,

    /// Movement between two own accounts.
    Transfer,
}

impl Category {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Salary => "SALARY",
            Self::Investment => "INVESTMENT",
            Self::Business => "BUSINESS",
            Self::OtherIncome => "OTHER_INCOME",
            Self::Housing => "HOUSING",
            Self::Transportation => "TRANSPORTATION",
            Self::Food => "FOOD",
            Self::Utilities => "UTILITIES",
            Self::Healthcare => "HEALTHCARE",
            Self::Entertainment => "ENTERTAINMENT",
            Self::Shopping => "SHOPPING",
            Self::Education => "EDUCATION",
            Self::DebtPayment => "DEBT_PAYMENT",
            Self::Savings => "SAVINGS",
            Self::OtherExpense => "OTHER_EXPENSE",
            Self::Transfer => "TRANSFER",
        }
    }

    /// Returns true for income categories.
    #[must_use]
    pub const fn is_income(self) -> bool {
        matches!(
            self,
            Self::Salary | Self::Investment | Self::Business | Self::OtherIncome
        )
    }

    /// Returns true for expense categories.
    #[must_use]
    pub const fn is_expense(self) -> bool {
        !self.is_income() && !matches!(self, Self::Transfer)
    }

    /// Catch-all category for a transaction type.
    #[must_use]
    pub const fn default_for(transaction_type: TransactionType) -> Self {
        match transaction_type {
            TransactionType::Income => Self::OtherIncome,
            TransactionType::Expense => Self::OtherExpense,
            TransactionType::Transfer => Self::Transfer,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transfer leg relative to its owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegDirection {
    /// Money leaves the owning account.
    Debit,
    /// Money arrives in the owning account.
    Credit,
}

/// A stored transaction record.
///
/// `amount` is a magnitude for INCOME and EXPENSE. Transfer legs carry a sign:
/// negative on the debit leg, positive on the credit leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Owning account.
    pub account_id: AccountId,
    /// Other side of a transfer.
    pub counterpart_account_id: Option<AccountId>,
    /// Shared reference between the two legs of a transfer.
    pub transfer_id: Option<TransferId>,
    /// Amount (see type-level docs for sign rules).
    pub amount: Decimal,
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// Category.
    pub category: Category,
    /// Merchant name, if known.
    pub merchant: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// When the transaction happened.
    pub occurred_at: DateTime<Utc>,
    /// Whether the transaction has not settled yet.
    pub pending: bool,
    /// Provider transaction id; the reconciliation key.
    pub external_id: Option<String>,
    /// Creation timestamp (immutable).
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a single-account INCOME or EXPENSE record from a validated request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidType` for transfer requests; those go through
    /// [`Transaction::transfer_legs`].
    pub fn from_validated(input: &ValidatedTransaction) -> Result<Self, LedgerError> {
        let transaction_type = match input.posting {
            Posting::Income => TransactionType::Income,
            Posting::Expense => TransactionType::Expense,
            Posting::Transfer { .. } => {
                return Err(LedgerError::InvalidType(
                    "transfer requests produce two legs".to_string(),
                ));
            }
        };

        let now = Utc::now();
        Ok(Self {
            id: TransactionId::new(),
            account_id: input.account_id,
            counterpart_account_id: None,
            transfer_id: None,
            amount: input.amount.abs(),
            transaction_type,
            category: input
                .category
                .unwrap_or(Category::default_for(transaction_type)),
            merchant: input.merchant.clone(),
            description: input.description.clone(),
            occurred_at: input.occurred_at,
            pending: true,
            external_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builds the debit and credit legs of a transfer, linked by a fresh
    /// transfer reference.
    #[must_use]
    pub fn transfer_legs(
        source: AccountId,
        target: AccountId,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> (Self, Self) {
        let now = Utc::now();
        let transfer_id = TransferId::new();
        let magnitude = amount.abs();

        let leg = |account_id, counterpart, amount, description: String| Self {
            id: TransactionId::new(),
            account_id,
            counterpart_account_id: Some(counterpart),
            transfer_id: Some(transfer_id),
            amount,
            transaction_type: TransactionType::Transfer,
            category: Category::Transfer,
            merchant: None,
            description: Some(description),
            occurred_at,
            pending: true,
            external_id: None,
            created_at: now,
            updated_at: now,
        };

        let debit = leg(
            source,
            target,
            -magnitude,
            format!("Transfer to account {target}"),
        );
        let credit = leg(
            target,
            source,
            magnitude,
            format!("Transfer from account {source}"),
        );
        (debit, credit)
    }

    /// Returns the leg direction of a transfer record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidType` when the record is not a well-formed transfer leg.
    pub fn leg_direction(&self) -> Result<LegDirection, LedgerError> {
        if self.transaction_type != TransactionType::Transfer || self.transfer_id.is_none() {
            return Err(LedgerError::InvalidType(format!(
                "{} record {} is not a transfer leg",
                self.transaction_type, self.id
            )));
        }
        if self.amount.is_sign_negative() {
            Ok(LegDirection::Debit)
        } else {
            Ok(LegDirection::Credit)
        }
    }

    /// Returns true if this record came from the external provider.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.external_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_type_from_str() {
        let cases = [
            ("income", TransactionType::Income),
            (" EXPENSE ", TransactionType::Expense),
            ("Transfer", TransactionType::Transfer),
        ];
        for (text, expected) in cases {
            assert_eq!(text.parse::<TransactionType>().unwrap(), expected);
        }
        assert!(matches!(
            "REFUND".parse::<TransactionType>(),
            Err(LedgerError::InvalidType(_))
        ));
    }

    #[test]
    fn test_category_partition() {
        assert!(Category::Salary.is_income());
        assert!(!Category::Salary.is_expense());
        assert!(Category::Food.is_expense());
        assert!(!Category::Transfer.is_income());
        assert!(!Category::Transfer.is_expense());
        assert_eq!(
            Category::default_for(TransactionType::Expense),
            Category::OtherExpense
        );
    }

    #[test]
    fn test_category_serde_name() {
        let json = serde_json::to_string(&Category::DebtPayment).unwrap();
        assert_eq!(json, "\"DEBT_PAYMENT\"");
        assert_eq!(Category::DebtPayment.to_string(), "DEBT_PAYMENT");
    }

    #[test]
    fn test_transfer_legs_are_linked() {
        let source = AccountId::new();
        let target = AccountId::new();
        let (debit, credit) = Transaction::transfer_legs(source, target, dec!(40), Utc::now());

        assert_eq!(debit.transfer_id, credit.transfer_id);
        assert!(debit.transfer_id.is_some());
        assert_eq!(debit.amount, dec!(-40));
        assert_eq!(credit.amount, dec!(40));
        assert_eq!(debit.account_id, source);
        assert_eq!(debit.counterpart_account_id, Some(target));
        assert_eq!(credit.account_id, target);
        assert_eq!(debit.leg_direction().unwrap(), LegDirection::Debit);
        assert_eq!(credit.leg_direction().unwrap(), LegDirection::Credit);
        assert_eq!(
            debit.description.as_deref(),
            Some(format!("Transfer to account {target}").as_str())
        );
    }
}
