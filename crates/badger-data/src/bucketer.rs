//! Month bucketing and chart-window truncation.

use std::collections::HashMap;

use badger_core::models::{PeriodKey, UsageRecord};

/// Default chart window, in months.
pub const COMPACT_WINDOW: usize = 6;
/// Expanded chart window, in months.
pub const EXPANDED_WINDOW: usize = 12;

// ── PeriodBucketer ────────────────────────────────────────────────────────────

/// Collapses a publisher's records into one record per month and truncates
/// to the most recent `window` months.
pub struct PeriodBucketer;

impl PeriodBucketer {
    /// Bucket `records` by month and keep the latest `window` months,
    /// returned ascending.
    ///
    /// When two records land in the same month the later one in input order
    /// replaces the earlier (last write wins, no merging). Truncation takes
    /// the most recent months, so older history falls off first.
    pub fn bucket(records: &[UsageRecord], window: usize) -> Vec<UsageRecord> {
        let mut by_month: HashMap<PeriodKey, UsageRecord> = HashMap::new();
        for record in records {
            by_month.insert(record.period.clone(), record.clone());
        }

        let mut months: Vec<UsageRecord> = by_month.into_values().collect();
        months.sort_by(|a, b| b.period.cmp(&a.period));
        months.truncate(window);
        months.reverse();
        months
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use badger_core::models::MetricTotals;

    fn record(period: &str, host_bytes: f64) -> UsageRecord {
        UsageRecord {
            publisher: "P".to_string(),
            period: PeriodKey::new(period).unwrap(),
            metrics: MetricTotals {
                host_bytes,
                ..MetricTotals::default()
            },
        }
    }

    #[test]
    fn test_bucket_sorts_ascending() {
        let records = vec![record("2024-03", 1.0), record("2024-01", 2.0), record("2024-02", 3.0)];
        let bucketed = PeriodBucketer::bucket(&records, COMPACT_WINDOW);
        let periods: Vec<&str> = bucketed.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[test]
    fn test_bucket_last_write_wins() {
        let records = vec![record("2024-01", 1.0), record("2024-01", 9.0)];
        let bucketed = PeriodBucketer::bucket(&records, COMPACT_WINDOW);
        assert_eq!(bucketed.len(), 1);
        // Replaced, not summed.
        assert_eq!(bucketed[0].metrics.host_bytes, 9.0);
    }

    #[test]
    fn test_bucket_truncates_oldest_first() {
        let records: Vec<UsageRecord> = (1..=8)
            .map(|m| record(&format!("2024-{m:02}"), m as f64))
            .collect();
        let bucketed = PeriodBucketer::bucket(&records, COMPACT_WINDOW);
        assert_eq!(bucketed.len(), 6);
        assert_eq!(bucketed[0].period.as_str(), "2024-03");
        assert_eq!(bucketed[5].period.as_str(), "2024-08");
    }

    #[test]
    fn test_bucket_shorter_than_window() {
        let records = vec![record("2024-01", 1.0)];
        let bucketed = PeriodBucketer::bucket(&records, EXPANDED_WINDOW);
        assert_eq!(bucketed.len(), 1);
    }

    #[test]
    fn test_bucket_empty() {
        assert!(PeriodBucketer::bucket(&[], COMPACT_WINDOW).is_empty());
    }
}
