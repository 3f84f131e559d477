//! Dashboard assembly: runs the full transform over freshly fetched data.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use badger_core::models::{PeriodKey, Publisher, UsageRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::company::{company_month_totals, CompanyPeriodTotals};
use crate::grouper::{group_by_house, records_by_publisher};
use crate::series::{SeriesBuilder, TimeSeries};

// ── Dashboard ─────────────────────────────────────────────────────────────────

/// Provenance and timing for one dashboard build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetadata {
    pub generated_at: DateTime<Utc>,
    pub publishers: usize,
    pub houses: usize,
    pub bandwidth_records: usize,
    pub token_records: usize,
    pub transform_time_seconds: f64,
}

/// Everything the views render, assembled in one pass.
///
/// Bandwidth and token records stay in separate collections; they come from
/// different datasets and month bucketing must never collapse one into the
/// other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Publishers grouped by house, in first-seen house order.
    pub houses: Vec<(String, Vec<Publisher>)>,
    pub records_by_publisher: HashMap<String, Vec<UsageRecord>>,
    pub token_records_by_publisher: HashMap<String, Vec<UsageRecord>>,
    /// One series per grouped publisher, including publishers with no
    /// bandwidth records (empty points, neutral trend).
    pub series_by_publisher: HashMap<String, TimeSeries>,
    pub company: Vec<CompanyPeriodTotals>,
    pub metadata: DashboardMetadata,
}

/// Run the full transform: group, index, build series, total the company.
///
/// Pure and deterministic for a given input; rebuilding from the same data
/// yields the same dashboard (modulo metadata timing).
pub fn build_dashboard(
    publishers: &[Publisher],
    bandwidth: Vec<UsageRecord>,
    tokens: Vec<UsageRecord>,
    window: usize,
    threshold: f64,
) -> Dashboard {
    let started = Instant::now();

    let houses = group_by_house(publishers);
    let records = records_by_publisher(&bandwidth);
    let token_records = records_by_publisher(&tokens);

    let mut series_by_publisher = HashMap::new();
    for (_, members) in &houses {
        for publisher in members {
            let publisher_records = records
                .get(&publisher.name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let series =
                SeriesBuilder::build(&publisher.name, publisher_records, window, threshold);
            series_by_publisher.insert(publisher.name.clone(), series);
        }
    }

    let company = company_month_totals(&bandwidth);

    let metadata = DashboardMetadata {
        generated_at: Utc::now(),
        publishers: houses.iter().map(|(_, members)| members.len()).sum(),
        houses: houses.len(),
        bandwidth_records: bandwidth.len(),
        token_records: tokens.len(),
        transform_time_seconds: started.elapsed().as_secs_f64(),
    };
    debug!(
        publishers = metadata.publishers,
        houses = metadata.houses,
        seconds = metadata.transform_time_seconds,
        "dashboard built"
    );

    Dashboard {
        houses,
        records_by_publisher: records,
        token_records_by_publisher: token_records,
        series_by_publisher,
        company,
        metadata,
    }
}

/// Every distinct month present in `records`, ascending.
pub fn available_months(records: &[UsageRecord]) -> Vec<PeriodKey> {
    let months: BTreeSet<PeriodKey> = records.iter().map(|r| r.period.clone()).collect();
    months.into_iter().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
