//! Per-publisher time series: chart points, trend slope and classification.

use badger_core::models::{PeriodKey, UsageRecord};
use badger_core::trend::{Trend, TrendCalculator};
use badger_core::units::gigabytes;
use serde::{Deserialize, Serialize};

use crate::bucketer::PeriodBucketer;

// ── ChartPoint ────────────────────────────────────────────────────────────────

/// One month of a publisher's bandwidth series, in display units.
///
/// Byte metrics are converted to GB (base-1000, two decimals); request counts
/// stay raw. `total_raw` keeps the unrounded byte total because the trend
/// slope is computed on raw values, not on the rounded display total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub period: PeriodKey,
    /// Short display label, e.g. `"Mar 24"`.
    pub label: String,
    pub host_gb: f64,
    pub image_gb: f64,
    pub gumlet_gb: f64,
    pub fastly_gb: f64,
    pub sketches_requests: f64,
    pub io_api_requests: f64,
    pub ha_proxy_requests: f64,
    /// Bandwidth total in GB, rounded for display.
    pub total_gb: f64,
    /// Bandwidth total in raw bytes.
    pub total_raw: f64,
}

impl ChartPoint {
    fn from_record(record: &UsageRecord) -> Self {
        let m = &record.metrics;
        let total_raw = m.bandwidth_total();
        ChartPoint {
            label: record.period.short_label(),
            period: record.period.clone(),
            host_gb: gigabytes(m.host_bytes),
            image_gb: gigabytes(m.image_bytes),
            gumlet_gb: gigabytes(m.gumlet_bytes),
            fastly_gb: gigabytes(m.fastly_bytes),
            sketches_requests: m.sketches_requests,
            io_api_requests: m.io_api_requests,
            ha_proxy_requests: m.ha_proxy_requests,
            total_gb: gigabytes(total_raw),
            total_raw,
        }
    }
}

// ── TimeSeries ────────────────────────────────────────────────────────────────

/// A publisher's windowed bandwidth series with its trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub publisher: String,
    /// Ascending by month, at most the window length.
    pub points: Vec<ChartPoint>,
    /// OLS slope of the raw byte totals, in bytes per period.
    pub slope: f64,
    pub trend: Trend,
}

/// Builds a [`TimeSeries`] from a publisher's raw records.
pub struct SeriesBuilder;

impl SeriesBuilder {
    /// Bucket, truncate to `window`, compute points and classify the trend.
    ///
    /// An empty record set is not an error: it yields an empty series with
    /// slope 0 and a neutral trend.
    pub fn build(
        publisher: &str,
        records: &[UsageRecord],
        window: usize,
        threshold: f64,
    ) -> TimeSeries {
        let bucketed = PeriodBucketer::bucket(records, window);
        let points: Vec<ChartPoint> = bucketed.iter().map(ChartPoint::from_record).collect();

        let totals: Vec<f64> = points.iter().map(|p| p.total_raw).collect();
        let slope = TrendCalculator::slope(&totals);
        TimeSeries {
            publisher: publisher.to_string(),
            points,
            slope,
            trend: Trend::classify(slope, threshold),
        }
    }
}

// ── Token points ──────────────────────────────────────────────────────────────

/// One month of a publisher's token usage, zero-filled over a fixed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPoint {
    pub period: PeriodKey,
    pub label: String,
    pub translation: f64,
    pub generation: f64,
    pub total: f64,
}

/// Project token records onto a fixed calendar window, ascending.
///
/// Unlike the bandwidth series, the token view renders every month of the
/// window even when no record exists for it; missing months show as zeros.
pub fn token_points(records: &[UsageRecord], months: &[PeriodKey]) -> Vec<TokenPoint> {
    months
        .iter()
        .map(|month| {
            let (translation, generation) = records
                .iter()
                .filter(|r| &r.period == month)
                .fold((0.0, 0.0), |(t, g), r| {
                    (t + r.metrics.translation_tokens, g + r.metrics.generation_tokens)
                });
            TokenPoint {
                period: month.clone(),
                label: month.short_label(),
                translation,
                generation,
                total: translation + generation,
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
