//! Read-side analysis: monthly summaries, spending trends and insights.

pub mod service;
pub mod types;


pub use service::AnalysisService;
pub use types::{FinancialSummary, MerchantSpend, Month, MonthlyAnalysis, SpendingTrends};
