//! Ingestion boundary: raw BI query results → typed records.
//!
//! Upstream column names are an external contract with the BI card schemas.
//! Everything permissive by design: absent columns default to 0, unparseable
//! numbers become 0 with a logged warning, and rows that cannot name a
//! publisher or a period are skipped. No raw row map travels past this
//! module.

use std::collections::{BTreeMap, HashMap};

use badger_core::error::{BadgerError, Result};
use badger_core::models::{Metric, MetricTotals, PeriodKey, Publisher, UsageRecord};
use serde_json::Value;
use tracing::{debug, warn};

// ── Upstream column contract ──────────────────────────────────────────────────

pub const PUBLISHER_NAME_COL: &str = "Publisher Name";
pub const DATE_MONTH_COL: &str = "Date: Month";
pub const TOKEN_DATE_COL: &str = "Date";
pub const TOKEN_COUNT_COL: &str = "Sage Tokens";
pub const SERVICE_SLUG_COL: &str = "Service Slug";
/// Token rows have carried two different pid column names over time.
pub const TOKEN_PID_COLS: [&str; 2] = ["Publisher → Pid", "Publisher ID"];
pub const HOUSE_NAME_COL: &str = "Publishing House__name";

/// Service slugs whose tokens count as translation rather than generation.
const TRANSLATION_SLUGS: [&str; 2] = ["google_translation", "azure_translation"];

// ── Field coercion ────────────────────────────────────────────────────────────

/// Read a numeric field, defaulting to 0 for absent/null values and for
/// values that fail numeric coercion (the latter with a warning).
pub fn numeric_field(row: &Value, column: &str) -> f64 {
    match row.get(column) {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                warn!(column, value = %s, "non-numeric metric value, using 0");
                0.0
            }
        },
        Some(other) => {
            warn!(column, value = %other, "non-numeric metric value, using 0");
            0.0
        }
    }
}

/// Read an integer id field, accepting both JSON numbers and digit strings.
fn id_field(row: &Value, column: &str) -> Option<i64> {
    match row.get(column) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field<'a>(row: &'a Value, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str).filter(|s| !s.is_empty())
}

// ── Dataset zipping ───────────────────────────────────────────────────────────

/// Zip a `/api/dataset` result (`{ data: { cols: [{name}], rows: [[..]] } }`)
/// into one JSON object per row, keyed by column name.
///
/// This must run before any other ingestion step; the rest of the pipeline
/// only ever sees named-field rows.
pub fn zip_dataset(result: &Value) -> Result<Vec<Value>> {
    let data = result
        .get("data")
        .ok_or_else(|| BadgerError::ResultShape("missing data".to_string()))?;

    let cols: Vec<String> = data
        .get("cols")
        .and_then(Value::as_array)
        .ok_or_else(|| BadgerError::ResultShape("missing data.cols".to_string()))?
        .iter()
        .map(|col| {
            col.get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| BadgerError::ResultShape("column without name".to_string()))
        })
        .collect::<Result<_>>()?;

    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| BadgerError::ResultShape("missing data.rows".to_string()))?;

    let mut zipped = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row
            .as_array()
            .ok_or_else(|| BadgerError::ResultShape("row is not an array".to_string()))?;
        let object: serde_json::Map<String, Value> = cols
            .iter()
            .cloned()
            .zip(cells.iter().cloned())
            .collect();
        zipped.push(Value::Object(object));
    }
    Ok(zipped)
}

// ── Row parsing ───────────────────────────────────────────────────────────────

/// Parse publisher/grouping rows (already zipped) into [`Publisher`] values.
pub fn parse_publisher_rows(rows: &[Value]) -> Vec<Publisher> {
    let mut publishers = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(name) = str_field(row, "name") else {
            debug!("skipping publisher row without a name");
            continue;
        };
        publishers.push(Publisher {
            pid: id_field(row, "pid").unwrap_or(0),
            name: name.to_string(),
            domain_url: str_field(row, "domain_url").unwrap_or("").to_string(),
            house: str_field(row, HOUSE_NAME_COL).map(str::to_string),
        });
    }
    publishers
}

/// Parse bandwidth card rows into usage records, one per row.
///
/// Rows missing a publisher name or a parseable month are dropped with a
/// warning; metric columns are read through [`numeric_field`].
pub fn parse_bandwidth_rows(rows: &[Value]) -> Vec<UsageRecord> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(publisher) = str_field(row, PUBLISHER_NAME_COL) else {
            warn!("bandwidth row without publisher name, skipping");
            continue;
        };
        let period = str_field(row, DATE_MONTH_COL).and_then(PeriodKey::from_date_str);
        let Some(period) = period else {
            warn!(publisher, "bandwidth row without a valid month, skipping");
            continue;
        };

        let mut metrics = MetricTotals::default();
        for metric in Metric::EXPORTABLE {
            if let Some(column) = metric.column() {
                metrics.set(metric, numeric_field(row, column));
            }
        }
        records.push(UsageRecord {
            publisher: publisher.to_string(),
            period,
            metrics,
        });
    }
    records
}

/// Parse token card rows into per-publisher-month usage records.
///
/// Token rows are keyed by publisher id and resolved to display names via
/// `pid_to_name` (built from the grouping dataset). Rows with an unknown pid
/// cannot name an entity and are dropped. Tokens are categorised by service
/// slug: translation slugs accrue to translation tokens, everything else to
/// generation tokens.
pub fn parse_token_rows(rows: &[Value], pid_to_name: &HashMap<i64, String>) -> Vec<UsageRecord> {
    // (publisher, period) → (translation, generation). BTreeMap keeps output
    // order deterministic across runs.
    let mut accumulator: BTreeMap<(String, PeriodKey), (f64, f64)> = BTreeMap::new();

    for row in rows {
        let pid = TOKEN_PID_COLS.iter().find_map(|col| id_field(row, col));
        let Some(pid) = pid else {
            debug!("token row without a pid, skipping");
            continue;
        };
        let Some(publisher) = pid_to_name.get(&pid) else {
            debug!(pid, "token row for unknown publisher, skipping");
            continue;
        };
        let Some(period) = str_field(row, TOKEN_DATE_COL).and_then(PeriodKey::from_date_str)
        else {
            warn!(publisher = %publisher, "token row without a valid date, skipping");
            continue;
        };

        let tokens = numeric_field(row, TOKEN_COUNT_COL);
        let slug = str_field(row, SERVICE_SLUG_COL)
            .map(str::to_lowercase)
            .unwrap_or_default();

        let entry = accumulator
            .entry((publisher.clone(), period))
            .or_insert((0.0, 0.0));
        if TRANSLATION_SLUGS.contains(&slug.as_str()) {
            entry.0 += tokens;
        } else {
            entry.1 += tokens;
        }
    }

    accumulator
        .into_iter()
        .map(|((publisher, period), (translation, generation))| UsageRecord {
            publisher,
            period,
            metrics: MetricTotals {
                translation_tokens: translation,
                generation_tokens: generation,
                ..MetricTotals::default()
            },
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
