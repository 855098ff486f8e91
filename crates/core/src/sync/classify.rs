//! Mapping provider records onto ledger records.

use chrono::Utc;
use finsync_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;

use super::types::ExternalTransaction;
use crate::ledger::{Category, Transaction, TransactionType};

/// Transaction type from the sign of a provider amount.
///
/// Zero counts as income.
#[must_use]
pub fn type_from_amount(amount: Decimal) -> TransactionType {
    if amount.is_sign_negative() && !amount.is_zero() {
        TransactionType::Expense
    } else {
        TransactionType::Income
    }
}

/// Maps a provider category label onto a category.
///
/// Accepts both our own names (`FOOD`) and the provider's primary labels
/// (`FOOD_AND_DRINK`). Returns `None` for anything unrecognised.
#[must_use]
pub fn category_from_hint(hint: &str) -> Option<Category> {
    let normalized = hint.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    let category = match normalized.as_str() {
        "SALARY" | "PAYROLL" | "INCOME_WAGES" => Category::Salary,
        "INVESTMENT" | "INCOME_DIVIDENDS" | "INCOME_INTEREST_EARNED" => Category::Investment,
        "BUSINESS" => Category::Business,
        "INCOME" | "OTHER_INCOME" | "INCOME_OTHER_INCOME" => Category::OtherIncome,
        "HOUSING" | "RENT" | "HOME_IMPROVEMENT" | "RENT_AND_UTILITIES_RENT" => Category::Housing,
        "TRANSPORTATION" | "TRAVEL" => Category::Transportation,
        "FOOD" | "FOOD_AND_DRINK" | "GROCERIES" | "RESTAURANTS" => Category::Food,
        "UTILITIES" | "RENT_AND_UTILITIES" => Category::Utilities,
        "HEALTHCARE" | "MEDICAL" => Category::Healthcare,
        "ENTERTAINMENT" => Category::Entertainment,
        "SHOPPING" | "GENERAL_MERCHANDISE" => Category::Shopping,
        "EDUCATION" => Category::Education,
        "DEBT_PAYMENT" | "LOAN_PAYMENTS" => Category::DebtPayment,
        "SAVINGS" => Category::Savings,
        "OTHER_EXPENSE" | "GENERAL_SERVICES" | "BANK_FEES" => Category::OtherExpense,
        _ => return None,
    };
    Some(category)
}

/// Category for a provider record of the given type.
///
/// A hint only sticks when it agrees with the type; an income label on an
/// outgoing amount falls back to the catch-all.
#[must_use]
pub fn category_for(transaction_type: TransactionType, hint: Option<&str>) -> Category {
    let fits = |c: &Category| match transaction_type {
        TransactionType::Income => c.is_income(),
        TransactionType::Expense => c.is_expense(),
        TransactionType::Transfer => *c == Category::Transfer,
    };
    hint.and_then(category_from_hint)
        .filter(fits)
        .unwrap_or(Category::default_for(transaction_type))
}

/// Builds a new local record for a provider transaction.
#[must_use]
pub fn to_record(ext: &ExternalTransaction, account_id: AccountId) -> Transaction {
    let transaction_type = type_from_amount(ext.amount);
    let now = Utc::now();
    Transaction {
        id: TransactionId::new(),
        account_id,
        counterpart_account_id: None,
        transfer_id: None,
        amount: ext.amount.abs(),
        transaction_type,
        category: category_for(transaction_type, ext.category_hint.as_deref()),
        merchant: ext.merchant.clone(),
        description: ext.description.clone(),
        occurred_at: ext.occurred_at(),
        pending: ext.pending,
        external_id: Some(ext.external_id.clone()),
        created_at: now,
        updated_at: now,
    }
}

/// Returns the existing record overwritten with the provider's values, or
/// `None` if nothing would change.
///
/// Identity, owning account and `created_at` are kept.
#[must_use]
pub fn revised(existing: &Transaction, ext: &ExternalTransaction) -> Option<Transaction> {
    let transaction_type = type_from_amount(ext.amount);
    let candidate = Transaction {
        amount: ext.amount.abs(),
        transaction_type,
        category: category_for(transaction_type, ext.category_hint.as_deref()),
        merchant: ext.merchant.clone(),
        description: ext.description.clone(),
        occurred_at: ext.occurred_at(),
        pending: ext.pending,
        ..existing.clone()
    };
    if candidate == *existing {
        return None;
    }
    Some(Transaction {
        updated_at: Utc::now(),
        ..candidate
    })
}
