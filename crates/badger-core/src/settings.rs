use clap::Parser;
use std::path::PathBuf;

use crate::error::{BadgerError, Result};
use crate::models::{Metric, PeriodKey};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Publisher bandwidth and token usage analytics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "badger",
    about = "Publisher bandwidth and token usage analytics",
    version
)]
pub struct Settings {
    /// View to render
    #[arg(long, default_value = "bandwidth", value_parser = ["bandwidth", "company", "trends", "tokens", "export"])]
    pub view: String,

    /// Base URL of the BI query service
    #[arg(long, env = "BADGER_BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// API key for the BI query service
    #[arg(long, env = "BADGER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Saved-question id for the bandwidth dataset
    #[arg(long, default_value_t = 232)]
    pub bandwidth_card_id: u32,

    /// Saved-question id for the token-usage dataset
    #[arg(long, default_value_t = 233)]
    pub tokens_card_id: u32,

    /// Chart window in months (6 compact, 12 expanded)
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(1..=24))]
    pub window: u32,

    /// Trend classification threshold, percent per period
    #[arg(long, default_value_t = 5.0)]
    pub trend_threshold: f64,

    /// Month to include in the export (YYYY-MM, repeatable; all when omitted)
    #[arg(long = "month")]
    pub months: Vec<String>,

    /// Metric column to include in the export (repeatable; all when omitted)
    #[arg(long = "metric")]
    pub metrics: Vec<String>,

    /// Output path for the export view
    #[arg(long, default_value = "badger_export.csv")]
    pub output: PathBuf,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// The API key, or a configuration error when neither `--api-key` nor
    /// `BADGER_API_KEY` was supplied.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                BadgerError::Config("api key required (--api-key or BADGER_API_KEY)".to_string())
            })
    }

    /// Parse the `--month` selections into period keys.
    ///
    /// An empty selection means "all available months" and is resolved by the
    /// caller against the loaded data.
    pub fn selected_months(&self) -> Result<Vec<PeriodKey>> {
        self.months
            .iter()
            .map(|m| {
                PeriodKey::new(m).ok_or_else(|| BadgerError::InvalidPeriod(m.clone()))
            })
            .collect()
    }

    /// Parse the `--metric` selections, defaulting to every bandwidth-dataset
    /// column when none were given.
    pub fn selected_metrics(&self) -> Result<Vec<Metric>> {
        if self.metrics.is_empty() {
            return Ok(Metric::EXPORTABLE.to_vec());
        }
        self.metrics
            .iter()
            .map(|name| {
                Metric::parse(name)
                    .ok_or_else(|| BadgerError::Config(format!("unknown metric: {name}")))
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        Settings::try_parse_from(std::iter::once("badger").chain(args.iter().copied()))
            .expect("settings parse")
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);
        assert_eq!(settings.view, "bandwidth");
        assert_eq!(settings.window, 6);
        assert_eq!(settings.bandwidth_card_id, 232);
        assert_eq!(settings.tokens_card_id, 233);
        assert!((settings.trend_threshold - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_view_rejected() {
        let result = Settings::try_parse_from(["badger", "--view", "spreadsheet"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_window_range_enforced() {
        assert!(Settings::try_parse_from(["badger", "--window", "0"]).is_err());
        assert!(Settings::try_parse_from(["badger", "--window", "25"]).is_err());
        let settings = parse(&["--window", "12"]);
        assert_eq!(settings.window, 12);
    }

    #[test]
    fn test_require_api_key_missing() {
        let mut settings = parse(&[]);
        settings.api_key = None;
        assert!(settings.require_api_key().is_err());
    }

    #[test]
    fn test_require_api_key_present() {
        let settings = parse(&["--api-key", "mb_test"]);
        assert_eq!(settings.require_api_key().unwrap(), "mb_test");
    }

    #[test]
    fn test_selected_months_parses_keys() {
        let settings = parse(&["--month", "2024-01", "--month", "2024-02"]);
        let months = settings.selected_months().unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].as_str(), "2024-01");
    }

    #[test]
    fn test_selected_months_rejects_bad_key() {
        let settings = parse(&["--month", "Jan-2024"]);
        assert!(settings.selected_months().is_err());
    }

    #[test]
    fn test_selected_metrics_default_is_full_bandwidth_schema() {
        let settings = parse(&[]);
        let metrics = settings.selected_metrics().unwrap();
        assert_eq!(metrics, Metric::EXPORTABLE.to_vec());
    }

    #[test]
    fn test_selected_metrics_explicit() {
        let settings = parse(&["--metric", "host", "--metric", "image"]);
        let metrics = settings.selected_metrics().unwrap();
        assert_eq!(metrics, vec![Metric::Host, Metric::Image]);
    }

    #[test]
    fn test_selected_metrics_unknown_rejected() {
        let settings = parse(&["--metric", "disk"]);
        assert!(settings.selected_metrics().is_err());
    }
}
