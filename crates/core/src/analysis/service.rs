//! Read-only aggregation over transactions.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::types::{FinancialSummary, MerchantSpend, Month, MonthlyAnalysis, SpendingTrends};
use crate::ledger::{Account, Category, Transaction, TransactionType};

/// Analysis service. Mutates nothing and never fails; empty input yields
/// zero totals.
pub struct AnalysisService;

impl AnalysisService {
    /// Income, expenses and spending breakdowns for one month.
    ///
    /// Transfers are excluded.
    #[must_use]
    pub fn monthly_analysis(transactions: &[Transaction], month: Month) -> MonthlyAnalysis {
        let in_month: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| month.contains(tx.occurred_at))
            .collect();

        let total_income = Self::sum_of(&in_month, TransactionType::Income);
        let total_expenses = Self::sum_of(&in_month, TransactionType::Expense);

        let mut spending_by_merchant = BTreeMap::new();
        for tx in in_month.iter().filter(|tx| Self::is_expense(tx)) {
            if let Some(merchant) = &tx.merchant {
                *spending_by_merchant
                    .entry(merchant.clone())
                    .or_insert(Decimal::ZERO) += tx.amount.abs();
            }
        }

        MonthlyAnalysis {
            total_income,
            total_expenses,
            net_savings: total_income - total_expenses,
            spending_by_category: Self::by_category(in_month.iter().copied()),
            spending_by_merchant,
        }
    }

    /// Expense trend over `months` consecutive months ending at `end`.
    #[must_use]
    pub fn spending_trends(
        transactions: &[Transaction],
        end: Month,
        months: u32,
    ) -> SpendingTrends {
        if months == 0 {
            return SpendingTrends::default();
        }

        let mut first = end;
        for _ in 1..months {
            first = first.prev();
        }

        let mut monthly_spending = BTreeMap::new();
        let mut cursor = first;
        loop {
            monthly_spending.insert(cursor, Decimal::ZERO);
            if cursor == end {
                break;
            }
            cursor = cursor.next();
        }

        let in_window: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| Self::is_expense(tx))
            .filter(|tx| monthly_spending.contains_key(&Month::containing(tx.occurred_at)))
            .collect();

        for tx in &in_window {
            if let Some(total) = monthly_spending.get_mut(&Month::containing(tx.occurred_at)) {
                *total += tx.amount.abs();
            }
        }

        let mut percentage_changes = BTreeMap::new();
        let mut previous: Option<Decimal> = None;
        for (month, total) in &monthly_spending {
            if let Some(change) = previous.and_then(|prev| Self::percentage_change(*total, prev)) {
                percentage_changes.insert(*month, change);
            }
            previous = Some(*total);
        }

        SpendingTrends {
            month_over_month: percentage_changes.get(&end).copied(),
            category_trends: Self::by_category(in_window.iter().copied()),
            monthly_spending,
            percentage_changes,
        }
    }

    /// All-time totals across accounts, with insights.
    ///
    /// Emits "Your total spending this month is X" for `current_month`, and
    /// "High spending in CATEGORY: X" for each category above `threshold`.
    #[must_use]
    pub fn financial_summary(
        accounts: &[Account],
        transactions: &[Transaction],
        current_month: Month,
        threshold: Decimal,
    ) -> FinancialSummary {
        let all: Vec<&Transaction> = transactions.iter().collect();
        let category_breakdown = Self::by_category(all.iter().copied());

        let this_month: Decimal = all
            .iter()
            .filter(|tx| Self::is_expense(tx) && current_month.contains(tx.occurred_at))
            .map(|tx| tx.amount.abs())
            .sum();

        let mut insights = vec![format!("Your total spending this month is {this_month}")];
        insights.extend(
            category_breakdown
                .iter()
                .filter(|(_, amount)| **amount > threshold)
                .map(|(category, amount)| format!("High spending in {category}: {amount}")),
        );

        FinancialSummary {
            total_balance: accounts.iter().map(|a| a.balance).sum(),
            total_income: Self::sum_of(&all, TransactionType::Income),
            total_expenses: Self::sum_of(&all, TransactionType::Expense),
            category_breakdown,
            insights,
        }
    }

    /// Merchants by total spend, highest first, at most `limit` entries.
    ///
    /// Ties are broken by merchant name.
    #[must_use]
    pub fn top_merchants(transactions: &[Transaction], limit: usize) -> Vec<MerchantSpend> {
        let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
        for tx in transactions.iter().filter(|tx| Self::is_expense(tx)) {
            if let Some(merchant) = tx.merchant.as_deref() {
                *totals.entry(merchant).or_insert(Decimal::ZERO) += tx.amount.abs();
            }
        }

        let mut ranked: Vec<MerchantSpend> = totals
            .into_iter()
            .map(|(merchant, total)| MerchantSpend {
                merchant: merchant.to_string(),
                total,
            })
            .collect();
        // stable sort keeps name order within equal totals
        ranked.sort_by(|a, b| b.total.cmp(&a.total));
        ranked.truncate(limit);
        ranked
    }

    /// `(current - previous) / previous * 100`, rounded to 2 decimal places.
    ///
    /// Returns `None` when `previous` is zero.
    #[must_use]
    pub fn percentage_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
        if previous.is_zero() {
            return None;
        }
        Some(((current - previous) / previous * Decimal::ONE_HUNDRED).round_dp(2))
    }

    fn is_expense(tx: &Transaction) -> bool {
        tx.transaction_type == TransactionType::Expense
    }

    fn sum_of(transactions: &[&Transaction], transaction_type: TransactionType) -> Decimal {
        transactions
            .iter()
            .filter(|tx| tx.transaction_type == transaction_type)
            .map(|tx| tx.amount.abs())
            .sum()
    }

    fn by_category<'a>(
        transactions: impl Iterator<Item = &'a Transaction>,
    ) -> BTreeMap<Category, Decimal> {
        let mut totals = BTreeMap::new();
        for tx in transactions.filter(|tx| Self::is_expense(tx)) {
            *totals.entry(tx.category).or_insert(Decimal::ZERO) += tx.amount.abs();
        }
        totals
    }
}
