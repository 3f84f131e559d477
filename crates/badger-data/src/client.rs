//! HTTP client for the BI query service.
//!
//! Two fetch shapes exist upstream: saved-question ("card") results, which
//! arrive as ready-made JSON row objects, and ad-hoc native SQL datasets,
//! which arrive column-major and are zipped into row objects here.

use badger_core::error::{BadgerError, Result};
use badger_core::models::Publisher;
use serde_json::{json, Value};
use tracing::debug;

use crate::ingest::{parse_publisher_rows, zip_dataset};

/// Database id the publisher grouping query runs against.
const GROUPING_DATABASE_ID: u32 = 7;

/// Native SQL for the publisher grouping dataset: every publisher joined to
/// its (possibly absent) publishing house.
const PUBLISHER_QUERY: &str = "\
SELECT p.pid, p.name, p.domain_url, ph.name AS \"Publishing House__name\" \
FROM publisher p \
LEFT JOIN publishing_house ph ON p.publishing_house_id = ph.id \
ORDER BY ph.name, p.name";

// ── UsageSource ───────────────────────────────────────────────────────────────

/// Source of the three upstream datasets.
///
/// Seam between the fetch layer and everything downstream; tests substitute
/// a stub source with canned rows.
pub trait UsageSource {
    /// Publishers with their house assignments.
    fn publishers(&self) -> Result<Vec<Publisher>>;
    /// Bandwidth card rows, one JSON object per publisher-month.
    fn bandwidth_rows(&self) -> Result<Vec<Value>>;
    /// Token card rows, one JSON object per usage event.
    fn token_rows(&self) -> Result<Vec<Value>>;
}

// ── MetabaseClient ────────────────────────────────────────────────────────────

/// Blocking client for a Metabase-compatible query API.
pub struct MetabaseClient {
    base_url: String,
    api_key: String,
    bandwidth_card_id: u32,
    tokens_card_id: u32,
    http: reqwest::blocking::Client,
}

impl MetabaseClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bandwidth_card_id: u32,
        tokens_card_id: u32,
    ) -> Self {
        MetabaseClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bandwidth_card_id,
            tokens_card_id,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch a saved question's result rows via `/api/card/{id}/query/json`.
    fn card_rows(&self, card_id: u32) -> Result<Vec<Value>> {
        let url = format!("{}/api/card/{}/query/json", self.base_url, card_id);
        debug!(card_id, "fetching card rows");
        let rows: Vec<Value> = self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&json!({}))
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(query_error)?
            .json()
            .map_err(query_error)?;
        debug!(card_id, rows = rows.len(), "card fetch complete");
        Ok(rows)
    }

    /// Run a native SQL query via `/api/dataset` and zip the column-major
    /// result into row objects.
    fn dataset(&self, query: &str, database: u32) -> Result<Vec<Value>> {
        let url = format!("{}/api/dataset", self.base_url);
        let body = json!({
            "database": database,
            "type": "native",
            "native": { "query": query },
            "parameters": [],
        });
        let result: Value = self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(query_error)?
            .json()
            .map_err(query_error)?;
        zip_dataset(&result)
    }
}

impl UsageSource for MetabaseClient {
    fn publishers(&self) -> Result<Vec<Publisher>> {
        let rows = self.dataset(PUBLISHER_QUERY, GROUPING_DATABASE_ID)?;
        Ok(parse_publisher_rows(&rows))
    }

    fn bandwidth_rows(&self) -> Result<Vec<Value>> {
        self.card_rows(self.bandwidth_card_id)
    }

    fn token_rows(&self) -> Result<Vec<Value>> {
        self.card_rows(self.tokens_card_id)
    }
}

fn query_error(e: reqwest::Error) -> BadgerError {
    BadgerError::Query(e.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
