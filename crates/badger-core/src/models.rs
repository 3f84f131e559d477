use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ── PeriodKey ─────────────────────────────────────────────────────────────────

/// A calendar-month identifier of the form `"YYYY-MM"`.
///
/// Validated on construction; the string form sorts lexicographically in
/// chronological order, so the derived `Ord` is the chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("static period regex"))
}

impl PeriodKey {
    /// Construct from an exact `"YYYY-MM"` string. Returns `None` when the
    /// string does not match.
    pub fn new(s: &str) -> Option<Self> {
        if period_re().is_match(s) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// Construct from any date string that starts with `"YYYY-MM"`, e.g.
    /// `"2024-03-01T00:00:00Z"` or `"2024-03-15"`. This mirrors the upstream
    /// convention of truncating `"Date: Month"` values to seven characters.
    pub fn from_date_str(s: &str) -> Option<Self> {
        s.get(..7).and_then(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(year, month)` split of the key. Always valid by construction.
    pub fn year_month(&self) -> (i32, u32) {
        let year = self.0[..4].parse().unwrap_or(0);
        let month = self.0[5..7].parse().unwrap_or(1);
        (year, month)
    }

    /// Short display label, e.g. `"Mar 24"` for `"2024-03"`.
    pub fn short_label(&self) -> String {
        self.label("%b %y")
    }

    /// Long display label, e.g. `"March 2024"` for `"2024-03"`.
    pub fn long_label(&self) -> String {
        self.label("%B %Y")
    }

    fn label(&self, fmt: &str) -> String {
        let (year, month) = self.year_month();
        match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(date) => date.format(fmt).to_string(),
            None => self.0.clone(),
        }
    }

    /// The key `months` calendar months before this one.
    pub fn minus_months(&self, months: u32) -> PeriodKey {
        let (year, month) = self.year_month();
        // Work in zero-based month arithmetic to handle year rollover.
        let total = year as i64 * 12 + (month as i64 - 1) - months as i64;
        let new_year = total.div_euclid(12);
        let new_month = total.rem_euclid(12) + 1;
        PeriodKey(format!("{:04}-{:02}", new_year, new_month))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `count` most recent months ending at `latest`, ascending.
///
/// Used by the token view, which always renders a fixed calendar window
/// anchored at the newest period seen in the data.
pub fn months_window(latest: &PeriodKey, count: u32) -> Vec<PeriodKey> {
    (0..count)
        .rev()
        .map(|back| latest.minus_months(back))
        .collect()
}

// ── Metric ────────────────────────────────────────────────────────────────────

/// Unit of a metric's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    /// Raw bytes; displayed as GB/TB using base-1000 conversion.
    Bytes,
    /// Plain counts (requests or tokens); displayed as-is.
    Count,
}

/// The closed set of sub-metrics measured per publisher per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Host,
    Image,
    Gumlet,
    Fastly,
    Sketches,
    IoApi,
    HaProxy,
    TranslationTokens,
    GenerationTokens,
}

impl Metric {
    /// Every metric, in canonical display order.
    pub const ALL: [Metric; 9] = [
        Metric::Host,
        Metric::Image,
        Metric::Gumlet,
        Metric::Fastly,
        Metric::Sketches,
        Metric::IoApi,
        Metric::HaProxy,
        Metric::TranslationTokens,
        Metric::GenerationTokens,
    ];

    /// The metrics present in the bandwidth dataset, i.e. the default export
    /// column set.
    pub const EXPORTABLE: [Metric; 7] = [
        Metric::Host,
        Metric::Image,
        Metric::Gumlet,
        Metric::Fastly,
        Metric::Sketches,
        Metric::IoApi,
        Metric::HaProxy,
    ];

    /// The byte-valued metrics that make up the bandwidth `total`.
    ///
    /// Request-count and token-count metrics are excluded: they are different
    /// units and summing them with bytes would be meaningless.
    pub const BANDWIDTH: [Metric; 4] =
        [Metric::Host, Metric::Image, Metric::Gumlet, Metric::Fastly];

    pub fn unit(self) -> MetricUnit {
        match self {
            Metric::Host | Metric::Image | Metric::Gumlet | Metric::Fastly => MetricUnit::Bytes,
            _ => MetricUnit::Count,
        }
    }

    /// Human-readable column/legend label.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Host => "Host Bandwidth",
            Metric::Image => "Image Bandwidth",
            Metric::Gumlet => "Gumlet Bandwidth",
            Metric::Fastly => "Fastly Host Bandwidth",
            Metric::Sketches => "Sketches Requests",
            Metric::IoApi => "IO API Requests",
            Metric::HaProxy => "HA Proxy Requests",
            Metric::TranslationTokens => "Translation Tokens",
            Metric::GenerationTokens => "Generation Tokens",
        }
    }

    /// The upstream column this metric is read from in the bandwidth dataset.
    ///
    /// These strings are an external contract with the BI card's schema.
    /// Token metrics come from a different dataset and have no column here.
    pub fn column(self) -> Option<&'static str> {
        match self {
            Metric::Host => Some("Sum of Host Bandwidth"),
            Metric::Image => Some("Sum of Image Bandwidth"),
            Metric::Gumlet => Some("Sum of Gum Let Bandwidth"),
            Metric::Fastly => Some("Sum of Fast Ly Host Bandwidth"),
            Metric::Sketches => Some("Sum of Sketches Request"),
            Metric::IoApi => Some("Sum of Quin Type Io Api Request"),
            Metric::HaProxy => Some("Sum of Frontend Ha Proxy Request"),
            Metric::TranslationTokens | Metric::GenerationTokens => None,
        }
    }

    /// Parse a CLI metric name, e.g. `"host"` or `"io-api"`.
    pub fn parse(name: &str) -> Option<Metric> {
        match name.to_lowercase().as_str() {
            "host" => Some(Metric::Host),
            "image" => Some(Metric::Image),
            "gumlet" => Some(Metric::Gumlet),
            "fastly" => Some(Metric::Fastly),
            "sketches" => Some(Metric::Sketches),
            "io-api" | "ioapi" => Some(Metric::IoApi),
            "ha-proxy" | "haproxy" => Some(Metric::HaProxy),
            "translation-tokens" => Some(Metric::TranslationTokens),
            "generation-tokens" => Some(Metric::GenerationTokens),
            _ => None,
        }
    }
}

// ── MetricTotals ──────────────────────────────────────────────────────────────

/// Named, validated per-metric values for one publisher-month.
///
/// Raw untyped row maps never travel past the ingestion boundary; they are
/// converted into this struct (absent or unparseable columns become 0).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    #[serde(default)]
    pub host_bytes: f64,
    #[serde(default)]
    pub image_bytes: f64,
    #[serde(default)]
    pub gumlet_bytes: f64,
    #[serde(default)]
    pub fastly_bytes: f64,
    #[serde(default)]
    pub sketches_requests: f64,
    #[serde(default)]
    pub io_api_requests: f64,
    #[serde(default)]
    pub ha_proxy_requests: f64,
    #[serde(default)]
    pub translation_tokens: f64,
    #[serde(default)]
    pub generation_tokens: f64,
}

impl MetricTotals {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Host => self.host_bytes,
            Metric::Image => self.image_bytes,
            Metric::Gumlet => self.gumlet_bytes,
            Metric::Fastly => self.fastly_bytes,
            Metric::Sketches => self.sketches_requests,
            Metric::IoApi => self.io_api_requests,
            Metric::HaProxy => self.ha_proxy_requests,
            Metric::TranslationTokens => self.translation_tokens,
            Metric::GenerationTokens => self.generation_tokens,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Host => self.host_bytes = value,
            Metric::Image => self.image_bytes = value,
            Metric::Gumlet => self.gumlet_bytes = value,
            Metric::Fastly => self.fastly_bytes = value,
            Metric::Sketches => self.sketches_requests = value,
            Metric::IoApi => self.io_api_requests = value,
            Metric::HaProxy => self.ha_proxy_requests = value,
            Metric::TranslationTokens => self.translation_tokens = value,
            Metric::GenerationTokens => self.generation_tokens = value,
        }
    }

    /// Sum of the four bandwidth byte metrics, in raw bytes.
    pub fn bandwidth_total(&self) -> f64 {
        self.host_bytes + self.image_bytes + self.gumlet_bytes + self.fastly_bytes
    }

    /// Sum of both token categories.
    pub fn token_total(&self) -> f64 {
        self.translation_tokens + self.generation_tokens
    }
}

// ── UsageRecord ───────────────────────────────────────────────────────────────

/// One publisher-month of usage, as supplied by the BI service.
///
/// Immutable once ingested; the pipeline never mutates records in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Publisher display name. Name equality is the join key throughout the
    /// pipeline; there is no stable numeric id at this layer (known
    /// fragility, inherited from the upstream schema).
    pub publisher: String,
    pub period: PeriodKey,
    pub metrics: MetricTotals,
}

// ── Publisher ─────────────────────────────────────────────────────────────────

/// A publisher and its (optional) publishing-house assignment, as returned
/// by the grouping dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    pub pid: i64,
    pub name: String,
    #[serde(default)]
    pub domain_url: String,
    /// Parent publishing house; `None` routes to the "Uncategorized" group.
    #[serde(default)]
    pub house: Option<String>,
}

/// Group name used for publishers with no house assignment.
pub const UNCATEGORIZED: &str = "Uncategorized";

// ── Tests ─────────────────────────────────────────────────────────────────────
