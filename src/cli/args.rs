use crate::config::EngineConfig;
use crate::feature::FeatureKind;
use crate::gateway::HttpGatewayConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Default gateway base URL
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080/api/v1/funds-transfer";

/// Drive validated transfer batches through the ledger gateway
#[derive(Parser, Debug)]
#[command(name = "batch-transfer-engine")]
#[command(about = "Drive validated transfer batches through the ledger gateway", long_about = None)]
pub struct CliArgs {
    /// Seed document with reference data, batches and rows
    #[arg(value_name = "SEED", help = "Path to the JSON seed document")]
    pub seed_file: PathBuf,

    /// Features to schedule (repeatable)
    #[arg(
        long = "feature",
        value_name = "FEATURE",
        value_enum,
        help = "Feature to run: 'funds-transfer' or 'funds-transfer-reversal' (default: both)"
    )]
    pub features: Vec<FeatureKind>,

    /// Gateway base URL
    #[arg(
        long = "gateway-url",
        env = "GATEWAY_URL",
        value_name = "URL",
        default_value = DEFAULT_GATEWAY_URL
    )]
    pub gateway_url: String,

    /// Basic auth user for the gateway
    #[arg(long = "gateway-user", env = "GATEWAY_USER", value_name = "USER")]
    pub gateway_user: Option<String>,

    /// Basic auth password for the gateway
    #[arg(
        long = "gateway-password",
        env = "GATEWAY_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true
    )]
    pub gateway_password: Option<String>,

    /// Gateway client timeout in seconds
    #[arg(long = "gateway-timeout", value_name = "SECS", default_value_t = 30)]
    pub gateway_timeout_secs: u64,

    /// Recoveries allowed before a row is quarantined
    #[arg(
        long = "max-retry",
        env = "MAX_RETRY",
        value_name = "COUNT",
        help = "Stuck-claim recoveries before a row is quarantined (default: 3)"
    )]
    pub max_retry: Option<u32>,

    /// Rows of one batch processed concurrently
    #[arg(
        long = "max-concurrent",
        env = "MAX_CONCURRENT_ROWS",
        value_name = "COUNT",
        help = "Rows of one batch in flight at once (default: 2)"
    )]
    pub max_concurrent_rows: Option<usize>,

    /// Scheduler interval in seconds
    #[arg(long = "interval", value_name = "SECS", help = "Scheduler interval (default: 60)")]
    pub interval_secs: Option<u64>,

    /// Retention of persisted log entries in hours
    #[arg(long = "log-retention", value_name = "HOURS", help = "Log retention (default: 24)")]
    pub log_retention_hours: Option<u64>,

    /// Run a single tick per feature and exit
    #[arg(long = "once")]
    pub once: bool,

    /// Emit logs as JSON
    #[arg(long = "json-logs", env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl CliArgs {
    /// Features to run; all of them when none was named
    pub fn selected_features(&self) -> Vec<FeatureKind> {
        if self.features.is_empty() {
            FeatureKind::ALL.to_vec()
        } else {
            let mut features = self.features.clone();
            features.sort_unstable_by_key(|kind| kind.key());
            features.dedup();
            features
        }
    }

    /// Create an EngineConfig from CLI arguments
    ///
    /// Values not given fall back to the defaults; zero values are rejected
    /// by [`EngineConfig::new`] with a warning.
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig::new(
            self.max_retry.unwrap_or(default.max_retry),
            self.max_concurrent_rows
                .unwrap_or(default.max_concurrent_rows),
            self.interval_secs
                .map(Duration::from_secs)
                .unwrap_or(default.interval),
            self.log_retention_hours
                .map(|hours| Duration::from_secs(hours.saturating_mul(3600)))
                .unwrap_or(default.log_retention),
        )
    }

    /// Create the gateway client configuration from CLI arguments
    pub fn to_gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.gateway_url.clone(),
            username: self.gateway_user.clone(),
            password: self.gateway_password.clone(),
            timeout: Duration::from_secs(self.gateway_timeout_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Feature selection tests
    #[rstest]
    #[case::default_all(&["program", "seed.json"], vec![FeatureKind::FundsTransfer, FeatureKind::FundsTransferReversal])]
    #[case::transfer_only(&["program", "--feature", "funds-transfer", "seed.json"], vec![FeatureKind::FundsTransfer])]
    #[case::repeated_features(
        &[
            "program",
            "--feature", "funds-transfer",
            "--feature", "funds-transfer-reversal",
            "--feature", "funds-transfer",
            "seed.json",
        ],
        vec![FeatureKind::FundsTransfer, FeatureKind::FundsTransferReversal]
    )]
    #[case::reversal_only(
        &["program", "--feature", "funds-transfer-reversal", "seed.json"],
        vec![FeatureKind::FundsTransferReversal]
    )]
    fn test_feature_selection(#[case] args: &[&str], #[case] expected: Vec<FeatureKind>) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.selected_features(), expected);
    }

    // Individual config option tests
    #[rstest]
    #[case::max_retry(&["program", "--max-retry", "5", "seed.json"], Some(5), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "seed.json"], None, Some(8))]
    #[case::no_options(&["program", "seed.json"], None, None)]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] max_retry: Option<u32>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.max_retry, max_retry);
        assert_eq!(parsed.max_concurrent_rows, max_concurrent);
    }

    // EngineConfig conversion tests
    #[rstest]
    #[case::all_defaults(&["program", "seed.json"], 3, 2, 60)]
    #[case::custom(
        &["program", "--max-retry", "4", "--max-concurrent", "6", "--interval", "5", "seed.json"],
        4,
        6,
        5
    )]
    #[case::zero_values_fall_back(
        &["program", "--max-retry", "0", "--max-concurrent", "0", "--interval", "0", "seed.json"],
        3,
        2,
        60
    )]
    fn test_engine_config_conversion(
        #[case] args: &[&str],
        #[case] max_retry: u32,
        #[case] max_concurrent: usize,
        #[case] interval_secs: u64,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_engine_config();

        assert_eq!(config.max_retry, max_retry);
        assert_eq!(config.max_concurrent_rows, max_concurrent);
        assert_eq!(config.interval, Duration::from_secs(interval_secs));
    }

    #[test]
    fn test_gateway_config() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--gateway-url",
            "https://t24.example/api",
            "--gateway-user",
            "svc",
            "--gateway-timeout",
            "10",
            "seed.json",
        ])
        .unwrap();
        let config = parsed.to_gateway_config();

        assert_eq!(config.base_url, "https://t24.example/api");
        assert_eq!(config.username.as_deref(), Some("svc"));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_once_flag() {
        assert!(CliArgs::try_parse_from(["program", "--once", "seed.json"]).unwrap().once);
    }

    // Error handling tests
    #[rstest]
    #[case::missing_seed(&["program"])]
    #[case::invalid_feature(&["program", "--feature", "payroll", "seed.json"])]
    #[case::invalid_number(&["program", "--max-retry", "many", "seed.json"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
