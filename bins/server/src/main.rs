//! Finsync sync daemon
//!
//! Seeds the store from a fixture, then reconciles every linked item on a
//! fixed interval until interrupted.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use finsync_core::analysis::{AnalysisService, Month};
use finsync_core::ledger::TransactionFilter;
use finsync_db::{
    AccountRepository, InMemoryStore, LedgerService, LedgerStore, LinkedItemRepository,
};
use finsync_shared::AppConfig;
use finsync_shared::config::{AnalysisConfig, LoggingConfig};
use finsync_sync::{Fixture, ReplayFeedClient, SyncReconciler, TimeoutFeedClient};

type Reconciler = SyncReconciler<InMemoryStore, TimeoutFeedClient<ReplayFeedClient>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    let ledger = Arc::new(LedgerService::new(Arc::new(InMemoryStore::new())));

    let client = match &config.fixtures.seed_path {
        Some(path) => {
            let fixture = Fixture::load(path).await?;
            info!(path = %path.display(), "Loading fixture");
            fixture.seed(&ledger).await?
        }
        None => {
            warn!("No fixture configured, starting with an empty store");
            ReplayFeedClient::new()
        }
    };

    let client =
        TimeoutFeedClient::new(client, Duration::from_secs(config.sync.fetch_timeout_secs));
    let reconciler = SyncReconciler::new(ledger, client)
        .with_max_concurrent_items(config.sync.max_concurrent_items);

    let mut ticker = tokio::time::interval(Duration::from_secs(config.sync.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        interval_secs = config.sync.interval_secs,
        max_concurrent_items = config.sync.max_concurrent_items,
        "Sync scheduler started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => run_sweep(&reconciler, &config.analysis).await,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_sweep(reconciler: &Reconciler, analysis: &AnalysisConfig) {
    match reconciler.sweep().await {
        Ok(report) => {
            for (item_id, reason) in &report.failed {
                warn!(item_id = %item_id, reason = %reason, "Item will be retried next tick");
            }
            if let Err(e) = log_summaries(reconciler, analysis).await {
                warn!(error = %e, "Could not compute financial summaries");
            }
        }
        Err(e) => error!(error = %e, "Sync sweep failed"),
    }
}

/// Logs a financial summary for every owner with a linked item.
async fn log_summaries(reconciler: &Reconciler, analysis: &AnalysisConfig) -> anyhow::Result<()> {
    let ledger = reconciler.ledger();
    let owners: BTreeSet<_> = ledger
        .store()
        .items()
        .list()
        .await?
        .into_iter()
        .map(|item| item.owner_id)
        .collect();

    let current = Month::containing(Utc::now());
    for owner_id in owners {
        let accounts = ledger.store().accounts().find_by_owner(owner_id).await?;
        let transactions = ledger
            .transactions_for_owner(owner_id, &TransactionFilter::default())
            .await?;

        let summary = AnalysisService::financial_summary(
            &accounts,
            &transactions,
            current,
            analysis.high_spending_threshold,
        );
        let trends =
            AnalysisService::spending_trends(&transactions, current, analysis.trend_months);

        info!(
            owner_id = %owner_id,
            total_balance = %summary.total_balance,
            total_income = %summary.total_income,
            total_expenses = %summary.total_expenses,
            month_over_month = ?trends.month_over_month,
            insights = ?summary.insights,
            "Financial summary"
        );
    }
    Ok(())
}
