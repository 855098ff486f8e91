//! Analysis result types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::ledger::Category;

/// A calendar month, ordered chronologically. Displays as `2024-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Creates a month; `month` is 1-based.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month a timestamp falls in.
    #[must_use]
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month number, 1 to 12.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following month.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month.
    #[must_use]
    pub const fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Returns true if the timestamp falls in this month.
    #[must_use]
    pub fn contains(self, at: DateTime<Utc>) -> bool {
        Self::containing(at) == self
    }

    /// Midnight UTC on the first day of the month.
    #[must_use]
    pub fn start(self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Income and spending for one month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyAnalysis {
    /// Sum of income.
    pub total_income: Decimal,
    /// Sum of expenses.
    pub total_expenses: Decimal,
    /// Income minus expenses.
    pub net_savings: Decimal,
    /// Expense totals per category.
    pub spending_by_category: BTreeMap<Category, Decimal>,
    /// Expense totals per merchant; records without a merchant are left out.
    pub spending_by_merchant: BTreeMap<String, Decimal>,
}

/// Spending over consecutive months.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpendingTrends {
    /// Expense total per month; every month in the window is present.
    pub monthly_spending: BTreeMap<Month, Decimal>,
    /// Expense totals per category over the whole window.
    pub category_trends: BTreeMap<Category, Decimal>,
    /// Percentage change against the previous month, for months whose
    /// previous month had non-zero spending.
    pub percentage_changes: BTreeMap<Month, Decimal>,
    /// Change of the last month against the one before, if defined.
    pub month_over_month: Option<Decimal>,
}

/// All-time totals and generated insights.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialSummary {
    /// Sum of all account balances.
    pub total_balance: Decimal,
    /// Sum of all income.
    pub total_income: Decimal,
    /// Sum of all expenses.
    pub total_expenses: Decimal,
    /// Expense totals per category.
    pub category_breakdown: BTreeMap<Category, Decimal>,
    /// Human-readable observations.
    pub insights: Vec<String>,
}

/// A merchant and the total spent there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantSpend {
    /// Merchant name.
    pub merchant: String,
    /// Total expense amount.
    pub total: Decimal,
}
