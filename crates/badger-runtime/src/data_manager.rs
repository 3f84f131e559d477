//! TTL-cached data manager over a [`UsageSource`].
//!
//! Wraps the fetch-and-transform pipeline with a configurable time-to-live
//! cache and transparent retry logic. Callers use
//! [`DataManager::get_dashboard`] to obtain a fresh-or-cached [`Dashboard`];
//! the manager handles staleness checks, up to three fetch attempts with
//! exponential back-off, and graceful fallback to the previous cache on
//! transient failure. A full batch failure with no prior cache is the only
//! hard failure in the system.

use std::collections::HashMap;
use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};

use badger_core::trend::DEFAULT_TREND_THRESHOLD;
use badger_data::bucketer::COMPACT_WINDOW;
use badger_data::client::UsageSource;
use badger_data::ingest::{parse_bandwidth_rows, parse_token_rows};
use badger_data::pipeline::{build_dashboard, Dashboard};
use badger_data::series::SeriesBuilder;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Maximum number of fetch attempts before giving up and returning stale data.
const MAX_RETRY_ATTEMPTS: u32 = 3;

// ── DataManager ───────────────────────────────────────────────────────────────

/// TTL-cached wrapper around the full fetch-and-transform pipeline.
pub struct DataManager<S: UsageSource> {
    source: S,
    /// Maximum age of cached data before it is considered stale.
    cache_ttl: Duration,
    /// Chart window in months, forwarded to the series builder.
    window: usize,
    /// Trend classification threshold in percent per period.
    threshold: f64,
    /// Most recently built dashboard.
    cache: Option<Dashboard>,
    /// When the cache was last populated.
    cache_timestamp: Option<Instant>,
    /// Human-readable description of the last error encountered.
    last_error: Option<String>,
    /// Publishers with a per-entity refresh currently in progress. A second
    /// refresh request for the same publisher is ignored while its marker is
    /// set; the marker is cleared on both success and failure.
    refreshing: HashSet<String>,
}

impl<S: UsageSource> DataManager<S> {
    pub fn new(source: S, cache_ttl_secs: u64, window: usize, threshold: f64) -> Self {
        Self {
            source,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            window,
            threshold,
            cache: None,
            cache_timestamp: None,
            last_error: None,
            refreshing: HashSet::new(),
        }
    }

    /// Manager with default TTL, window and threshold.
    pub fn with_defaults(source: S) -> Self {
        Self::new(
            source,
            DEFAULT_CACHE_TTL_SECS,
            COMPACT_WINDOW,
            DEFAULT_TREND_THRESHOLD,
        )
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the dashboard, using the cache when it is still valid.
    ///
    /// When `force_refresh` is `true` the cache is bypassed and a fresh fetch
    /// is always attempted. On fetch failure the previous cache (if any) is
    /// returned as a best-effort fallback; `None` means there is no data at
    /// all and [`DataManager::last_error`] says why.
    ///
    /// The fetch is retried up to [`MAX_RETRY_ATTEMPTS`] times with
    /// exponential back-off (0 ms → 100 ms → 200 ms).
    pub fn get_dashboard(&mut self, force_refresh: bool) -> Option<&Dashboard> {
        if !force_refresh && self.is_cache_valid() {
            tracing::debug!("returning cached dashboard");
            return self.cache.as_ref();
        }

        match self.fetch_with_retry() {
            Ok(dashboard) => {
                tracing::debug!(
                    publishers = dashboard.metadata.publishers,
                    bandwidth_records = dashboard.metadata.bandwidth_records,
                    "dashboard cache updated"
                );
                self.cache = Some(dashboard);
                self.cache_timestamp = Some(Instant::now());
                self.last_error = None;
                self.cache.as_ref()
            }
            Err(e) => {
                tracing::warn!(error = %e, "fetch failed; falling back to cached data");
                self.last_error = Some(e);
                // Return whatever we have, even if stale.
                self.cache.as_ref()
            }
        }
    }

    /// Re-fetch bandwidth data for a single publisher and splice the result
    /// into the cached dashboard, rebuilding that publisher's series.
    ///
    /// Returns `false` when there is no cache yet, a refresh for this
    /// publisher is already in flight, or the fetch fails. A batch refresh
    /// that completes while this runs may be overwritten by the spliced
    /// per-entity data; accepted, the next batch fetch reconciles.
    pub fn refresh_publisher(&mut self, name: &str) -> bool {
        if self.cache.is_none() {
            tracing::debug!(publisher = name, "no dashboard to refresh into");
            return false;
        }
        if !self.refreshing.insert(name.to_string()) {
            tracing::debug!(publisher = name, "refresh already in flight, skipping");
            return false;
        }

        let result = self.source.bandwidth_rows();
        self.refreshing.remove(name);

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(publisher = name, error = %e, "publisher refresh failed");
                self.last_error = Some(e.to_string());
                return false;
            }
        };

        let records: Vec<_> = parse_bandwidth_rows(&rows)
            .into_iter()
            .filter(|r| r.publisher == name)
            .collect();
        let series = SeriesBuilder::build(name, &records, self.window, self.threshold);

        if let Some(dashboard) = self.cache.as_mut() {
            dashboard
                .records_by_publisher
                .insert(name.to_string(), records);
            dashboard.series_by_publisher.insert(name.to_string(), series);
        }
        tracing::debug!(publisher = name, "publisher refreshed");
        true
    }

    /// Discard the current cache, forcing the next
    /// [`get_dashboard`](DataManager::get_dashboard) call to fetch.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        self.cache_timestamp = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the current cache entry, or `None` if no data has been fetched.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    /// Human-readable description of the last fetch error, or `None`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// `true` when the cache holds data that is still within its TTL.
    fn is_cache_valid(&self) -> bool {
        match (self.cache.as_ref(), self.cache_timestamp) {
            (Some(_), Some(ts)) => ts.elapsed() < self.cache_ttl,
            _ => false,
        }
    }

    /// Attempt up to [`MAX_RETRY_ATTEMPTS`] fetches with exponential back-off.
    ///
    /// Back-off schedule: attempt 1 → 0 ms, attempt 2 → 100 ms, attempt 3 → 200 ms.
    fn fetch_with_retry(&mut self) -> Result<Dashboard, String> {
        let mut last_err = String::new();

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                let sleep_ms = (attempt as u64) * 100;
                tracing::debug!(attempt, sleep_ms, "retrying fetch after back-off");
                thread::sleep(Duration::from_millis(sleep_ms));
            }

            match self.fetch_fresh() {
                Ok(dashboard) => return Ok(dashboard),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "fetch attempt failed");
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }

    /// Fetch all three datasets and run the transform.
    fn fetch_fresh(&self) -> Result<Dashboard, String> {
        let publishers = self.source.publishers().map_err(|e| e.to_string())?;
        let bandwidth_rows = self.source.bandwidth_rows().map_err(|e| e.to_string())?;
        let token_rows = self.source.token_rows().map_err(|e| e.to_string())?;

        let pid_to_name: HashMap<i64, String> = publishers
            .iter()
            .map(|p| (p.pid, p.name.clone()))
            .collect();
        let bandwidth = parse_bandwidth_rows(&bandwidth_rows);
        let tokens = parse_token_rows(&token_rows, &pid_to_name);

        Ok(build_dashboard(
            &publishers,
            bandwidth,
            tokens,
            self.window,
            self.threshold,
        ))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use badger_core::error::{BadgerError, Result};
    use badger_core::models::Publisher;
    use serde_json::{json, Value};
    use std::cell::Cell;

    /// Canned-data source. `fail` makes every fetch return an error;
    /// `fetches` counts bandwidth fetches to observe cache behaviour.
    struct StubSource {
        fail: Cell<bool>,
        fetches: Cell<u32>,
    }

    impl StubSource {
        fn new() -> Self {
            StubSource {
                fail: Cell::new(false),
                fetches: Cell::new(0),
            }
        }
    }

    impl UsageSource for StubSource {
        fn publishers(&self) -> Result<Vec<Publisher>> {
            if self.fail.get() {
                return Err(BadgerError::Query("stub failure".to_string()));
            }
            Ok(vec![Publisher {
                pid: 7,
                name: "Alpha".to_string(),
                domain_url: "alpha.example.com".to_string(),
                house: Some("House".to_string()),
            }])
        }

        fn bandwidth_rows(&self) -> Result<Vec<Value>> {
            if self.fail.get() {
                return Err(BadgerError::Query("stub failure".to_string()));
            }
            self.fetches.set(self.fetches.get() + 1);
            Ok(vec![json!({
                "Publisher Name": "Alpha",
                "Date: Month": "2024-01-01",
                "Sum of Host Bandwidth": 1_000_000_000.0,
            })])
        }

        fn token_rows(&self) -> Result<Vec<Value>> {
            if self.fail.get() {
                return Err(BadgerError::Query("stub failure".to_string()));
            }
            Ok(vec![json!({
                "Publisher → Pid": 7,
                "Date": "2024-01-15",
                "Sage Tokens": 42,
                "Service Slug": "google_translation",
            })])
        }
    }

    fn manager(ttl_secs: u64) -> DataManager<StubSource> {
        DataManager::new(StubSource::new(), ttl_secs, 6, DEFAULT_TREND_THRESHOLD)
    }

    #[test]
    fn test_first_call_populates_cache() {
        let mut mgr = manager(30);
        assert!(mgr.cache_age().is_none());

        let dashboard = mgr.get_dashboard(false).expect("dashboard");
        assert_eq!(dashboard.metadata.publishers, 1);
        assert_eq!(dashboard.metadata.bandwidth_records, 1);
        assert_eq!(dashboard.metadata.token_records, 1);
        assert!(mgr.last_error().is_none());
        assert!(mgr.cache_age().is_some());
    }

    #[test]
    fn test_cache_hit_within_ttl() {
        let mut mgr = manager(30);
        mgr.get_dashboard(false);
        mgr.get_dashboard(false);
        assert_eq!(mgr.source.fetches.get(), 1);
    }

    #[test]
    fn test_ttl_zero_always_refetches() {
        let mut mgr = manager(0);
        mgr.get_dashboard(false);
        mgr.get_dashboard(false);
        assert_eq!(mgr.source.fetches.get(), 2);
    }

    #[test]
    fn test_force_refresh_bypasses_cache() {
        let mut mgr = manager(60);
        mgr.get_dashboard(false);
        mgr.get_dashboard(true);
        assert_eq!(mgr.source.fetches.get(), 2);
    }

    #[test]
    fn test_failure_with_no_cache_is_none() {
        let mut mgr = manager(30);
        mgr.source.fail.set(true);
        assert!(mgr.get_dashboard(false).is_none());
        assert!(mgr.last_error().is_some());
    }

    #[test]
    fn test_failure_falls_back_to_stale_cache() {
        let mut mgr = manager(0);
        mgr.get_dashboard(false);

        mgr.source.fail.set(true);
        let dashboard = mgr.get_dashboard(false);
        assert!(dashboard.is_some(), "stale cache should be served");
        assert!(mgr.last_error().is_some());
    }

    #[test]
    fn test_error_cleared_on_recovery() {
        let mut mgr = manager(0);
        mgr.source.fail.set(true);
        mgr.get_dashboard(false);
        assert!(mgr.last_error().is_some());

        mgr.source.fail.set(false);
        mgr.get_dashboard(false);
        assert!(mgr.last_error().is_none());
    }

    #[test]
    fn test_invalidate_cache() {
        let mut mgr = manager(60);
        mgr.get_dashboard(false);
        mgr.invalidate_cache();
        assert!(mgr.cache_age().is_none());
        mgr.get_dashboard(false);
        assert_eq!(mgr.source.fetches.get(), 2);
    }

    #[test]
    fn test_refresh_publisher_updates_series() {
        let mut mgr = manager(60);
        mgr.get_dashboard(false);

        assert!(mgr.refresh_publisher("Alpha"));
        let dashboard = mgr.cache.as_ref().unwrap();
        assert_eq!(dashboard.records_by_publisher["Alpha"].len(), 1);
        assert_eq!(dashboard.series_by_publisher["Alpha"].points.len(), 1);
        // The marker is cleared afterwards.
        assert!(mgr.refreshing.is_empty());
    }

    #[test]
    fn test_refresh_publisher_without_cache_is_noop() {
        let mut mgr = manager(60);
        assert!(!mgr.refresh_publisher("Alpha"));
    }

    #[test]
    fn test_refresh_publisher_failure_clears_marker() {
        let mut mgr = manager(60);
        mgr.get_dashboard(false);

        mgr.source.fail.set(true);
        assert!(!mgr.refresh_publisher("Alpha"));
        assert!(mgr.refreshing.is_empty());
        assert!(mgr.last_error().is_some());
    }
}
