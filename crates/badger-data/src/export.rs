//! Flat export table: one row per publisher per selected month, with
//! per-publisher TOTAL rows and blank separators, written as CSV.

use std::collections::HashMap;
use std::io;

use badger_core::error::{BadgerError, Result};
use badger_core::models::{Metric, MetricUnit, PeriodKey, Publisher, UsageRecord};
use badger_core::units::{gigabytes, round2};
use serde::{Deserialize, Serialize};

// ── Row model ─────────────────────────────────────────────────────────────────

/// The cell values of one export line, already in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportLine {
    pub house: String,
    pub publisher: String,
    pub domain: String,
    /// Long month label for data rows, `"TOTAL"` for total rows.
    pub month: String,
    /// One value per selected metric, in column order.
    pub values: Vec<f64>,
    /// Synthesized grand-total column; present only when more than one
    /// metric is selected.
    pub total: Option<f64>,
}

/// A row of the export table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportRow {
    Data(ExportLine),
    Total(ExportLine),
    /// Visual separator between publishers.
    Blank,
}

// ── Table building ────────────────────────────────────────────────────────────

/// Builds the flat export table from grouped publishers and their records.
pub struct ExportTableBuilder;

impl ExportTableBuilder {
    /// Build rows in house order, then publisher order, then ascending month
    /// order, ending each publisher with a TOTAL row and a blank separator.
    ///
    /// Every selected period gets a data row even when the publisher has no
    /// record for it (all-zero cells). Byte metrics are shown in GB; count
    /// metrics stay raw. The TOTAL row sums raw per-metric values across the
    /// selected periods before converting, so it is not simply the sum of the
    /// rounded cells above it.
    pub fn build(
        houses: &[(String, Vec<Publisher>)],
        records: &HashMap<String, Vec<UsageRecord>>,
        periods: &[PeriodKey],
        metrics: &[Metric],
    ) -> Vec<ExportRow> {
        let with_total = metrics.len() > 1;
        let mut rows = Vec::new();

        for (house, publishers) in houses {
            for publisher in publishers {
                // Last write wins when a publisher has duplicate months.
                let mut by_month: HashMap<&PeriodKey, &UsageRecord> = HashMap::new();
                if let Some(publisher_records) = records.get(&publisher.name) {
                    for record in publisher_records {
                        by_month.insert(&record.period, record);
                    }
                }

                let mut raw_totals = vec![0.0; metrics.len()];
                for period in periods {
                    let record = by_month.get(period).copied();
                    let mut values = Vec::with_capacity(metrics.len());
                    for (i, metric) in metrics.iter().enumerate() {
                        let raw = record.map_or(0.0, |r| r.metrics.get(*metric));
                        raw_totals[i] += raw;
                        values.push(display_value(*metric, raw));
                    }
                    let total = with_total.then(|| round2(values.iter().sum()));
                    rows.push(ExportRow::Data(ExportLine {
                        house: house.clone(),
                        publisher: publisher.name.clone(),
                        domain: publisher.domain_url.clone(),
                        month: period.long_label(),
                        values,
                        total,
                    }));
                }

                let values: Vec<f64> = metrics
                    .iter()
                    .zip(&raw_totals)
                    .map(|(metric, &raw)| display_value(*metric, raw))
                    .collect();
                let total = with_total.then(|| round2(values.iter().sum()));
                rows.push(ExportRow::Total(ExportLine {
                    house: house.clone(),
                    publisher: publisher.name.clone(),
                    domain: publisher.domain_url.clone(),
                    month: "TOTAL".to_string(),
                    values,
                    total,
                }));
                rows.push(ExportRow::Blank);
            }
        }
        rows
    }
}

/// Convert a raw metric value to its export display unit.
fn display_value(metric: Metric, raw: f64) -> f64 {
    match metric.unit() {
        MetricUnit::Bytes => gigabytes(raw),
        MetricUnit::Count => raw,
    }
}

// ── CSV writing ───────────────────────────────────────────────────────────────

/// Write the export table as CSV.
///
/// Byte and total cells use two decimals, count cells are whole numbers, and
/// blank separator rows become records of empty fields.
pub fn write_csv<W: io::Write>(rows: &[ExportRow], metrics: &[Metric], out: W) -> Result<()> {
    let with_total = metrics.len() > 1;
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["Publishing House", "Publisher Name", "Domain", "Month"];
    header.extend(metrics.iter().map(|m| m.label()));
    if with_total {
        header.push("Total");
    }
    let width = header.len();
    writer.write_record(&header).map_err(csv_error)?;

    for row in rows {
        match row {
            ExportRow::Data(line) | ExportRow::Total(line) => {
                let mut record = vec![
                    line.house.clone(),
                    line.publisher.clone(),
                    line.domain.clone(),
                    line.month.clone(),
                ];
                for (metric, value) in metrics.iter().zip(&line.values) {
                    record.push(match metric.unit() {
                        MetricUnit::Bytes => format!("{value:.2}"),
                        MetricUnit::Count => format!("{value:.0}"),
                    });
                }
                if let Some(total) = line.total {
                    record.push(format!("{total:.2}"));
                }
                writer.write_record(&record).map_err(csv_error)?;
            }
            ExportRow::Blank => {
                writer
                    .write_record(vec![""; width])
                    .map_err(csv_error)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> BadgerError {
    BadgerError::Export(e.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
