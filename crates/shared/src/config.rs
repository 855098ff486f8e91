//! Application configuration management.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Reconciliation sweep configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Analysis defaults.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Fixture seeding configuration.
    #[serde(default)]
    pub fixtures: FixtureConfig,
}

/// Reconciliation sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Seconds between two scheduled sweeps.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound for a single provider fetch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Maximum number of linked items reconciled at the same time.
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
}

fn default_interval_secs() -> u64 {
    3600 // 1 hour
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_items() -> usize {
    4
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}

/// Analysis defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Number of month buckets in a spending trend.
    #[serde(default = "default_trend_months")]
    pub trend_months: u32,
    /// Category spend above which an insight is emitted.
    #[serde(default = "default_high_spending_threshold")]
    pub high_spending_threshold: Decimal,
}

fn default_trend_months() -> u32 {
    6
}

fn default_high_spending_threshold() -> Decimal {
    Decimal::ONE_THOUSAND
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_months: default_trend_months(),
            high_spending_threshold: default_high_spending_threshold(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "finsync=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

/// Fixture seeding configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureConfig {
    /// JSON file with accounts, linked items and scripted provider pages.
    pub seed_path: Option<PathBuf>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FINSYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(
            [
                "FINSYNC__SYNC__INTERVAL_SECS",
                "FINSYNC__LOGGING__JSON",
                "FINSYNC__ANALYSIS__HIGH_SPENDING_THRESHOLD",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.sync.interval_secs, 3600);
                assert_eq!(config.sync.fetch_timeout_secs, 30);
                assert_eq!(config.sync.max_concurrent_items, 4);
                assert_eq!(config.analysis.trend_months, 6);
                assert_eq!(config.analysis.high_spending_threshold, dec!(1000));
                assert_eq!(config.logging.filter, "finsync=info");
                assert!(!config.logging.json);
                assert!(config.fixtures.seed_path.is_none());
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("FINSYNC__SYNC__INTERVAL_SECS", Some("60")),
                ("FINSYNC__LOGGING__JSON", Some("true")),
                ("FINSYNC__ANALYSIS__HIGH_SPENDING_THRESHOLD", Some("250.50")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.sync.interval_secs, 60);
                assert!(config.logging.json);
                assert_eq!(config.analysis.high_spending_threshold, dec!(250.50));
            },
        );
    }
}
