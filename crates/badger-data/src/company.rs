//! Company-wide bandwidth totals, summed across publishers per month.

use std::collections::BTreeMap;

use badger_core::models::{PeriodKey, UsageRecord};
use badger_core::units::{round2, terabytes};
use serde::{Deserialize, Serialize};

/// One month of company-wide bandwidth, in TB per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPeriodTotals {
    pub period: PeriodKey,
    pub host_tb: f64,
    pub image_tb: f64,
    pub gumlet_tb: f64,
    pub fastly_tb: f64,
    /// Sum of the four rounded component TB values, re-rounded. This matches
    /// how the original dashboard displayed the total, so it can drift a cent
    /// or two from converting the raw sum directly.
    pub total_tb: f64,
}

/// Sum raw bandwidth bytes across all publishers for each month, ascending.
pub fn company_month_totals(records: &[UsageRecord]) -> Vec<CompanyPeriodTotals> {
    // (host, image, gumlet, fastly) raw byte sums per month.
    let mut by_month: BTreeMap<PeriodKey, (f64, f64, f64, f64)> = BTreeMap::new();
    for record in records {
        let sums = by_month
            .entry(record.period.clone())
            .or_insert((0.0, 0.0, 0.0, 0.0));
        sums.0 += record.metrics.host_bytes;
        sums.1 += record.metrics.image_bytes;
        sums.2 += record.metrics.gumlet_bytes;
        sums.3 += record.metrics.fastly_bytes;
    }

    by_month
        .into_iter()
        .map(|(period, (host, image, gumlet, fastly))| {
            let host_tb = terabytes(host);
            let image_tb = terabytes(image);
            let gumlet_tb = terabytes(gumlet);
            let fastly_tb = terabytes(fastly);
            CompanyPeriodTotals {
                period,
                host_tb,
                image_tb,
                gumlet_tb,
                fastly_tb,
                total_tb: round2(host_tb + image_tb + gumlet_tb + fastly_tb),
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
