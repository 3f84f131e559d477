use serde::{Deserialize, Serialize};

/// Default classification threshold, in percent-per-period under the
/// convention described on [`Trend::classify`].
pub const DEFAULT_TREND_THRESHOLD: f64 = 5.0;

// ── TrendCalculator ───────────────────────────────────────────────────────────

/// Stateless ordinary-least-squares slope calculation over a period series.
pub struct TrendCalculator;

impl TrendCalculator {
    /// OLS slope of `values` against the sequential index `x = 1..N`.
    ///
    /// The x axis is the position in the series, not calendar spacing, so a
    /// missing month between two points does not widen the gap. The result is
    /// in "total metric units per period"; callers wanting a percentage must
    /// divide by their own baseline.
    ///
    /// Returns `0.0` for series shorter than two points (insufficient data,
    /// not an error) and when the denominator is zero.
    pub fn slope(values: &[f64]) -> f64 {
        let n = values.len();
        if n < 2 {
            return 0.0;
        }

        let n_f = n as f64;
        // x = 1..N, so x̄ = (N + 1) / 2.
        let x_mean = (n_f + 1.0) / 2.0;
        let y_mean = values.iter().sum::<f64>() / n_f;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, &y) in values.iter().enumerate() {
            let dx = (i + 1) as f64 - x_mean;
            numerator += dx * (y - y_mean);
            denominator += dx * dx;
        }

        // Cannot happen with strictly sequential x, but guard anyway.
        if denominator == 0.0 {
            return 0.0;
        }
        numerator / denominator
    }
}

// ── Trend ─────────────────────────────────────────────────────────────────────

/// Growth classification of a publisher's usage series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Gainer,
    Loser,
    Neutral,
}

impl Trend {
    /// Classify a slope against a percentage threshold.
    ///
    /// Convention (inherited from the original dashboard and kept for output
    /// parity): `slope * 100` is treated as the percentage change per period,
    /// i.e. the slope is assumed to already be expressed as a fractional
    /// growth rate. `threshold` is in percent; the default is
    /// [`DEFAULT_TREND_THRESHOLD`] (5% per period). Easy to get backwards --
    /// no further normalisation by a baseline happens here.
    pub fn classify(slope: f64, threshold: f64) -> Trend {
        let percentage = slope * 100.0;
        if percentage > threshold {
            Trend::Gainer
        } else if percentage < -threshold {
            Trend::Loser
        } else {
            Trend::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Gainer => "gainer",
            Trend::Loser => "loser",
            Trend::Neutral => "neutral",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── slope ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_slope_constant_series_is_zero() {
        let slope = TrendCalculator::slope(&[5.0, 5.0, 5.0, 5.0, 5.0, 5.0]);
        assert!(slope.abs() < 1e-12, "slope = {slope}");
    }

    #[test]
    fn test_slope_arithmetic_series_is_one() {
        let slope = TrendCalculator::slope(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!((slope - 1.0).abs() < 1e-12, "slope = {slope}");
    }

    #[test]
    fn test_slope_decreasing_series_is_negative() {
        let slope = TrendCalculator::slope(&[10.0, 8.0, 6.0, 4.0]);
        assert!((slope + 2.0).abs() < 1e-12, "slope = {slope}");
    }

    #[test]
    fn test_slope_empty_series_is_zero() {
        assert_eq!(TrendCalculator::slope(&[]), 0.0);
    }

    #[test]
    fn test_slope_single_point_is_zero() {
        assert_eq!(TrendCalculator::slope(&[42.0]), 0.0);
    }

    #[test]
    fn test_slope_two_points() {
        let slope = TrendCalculator::slope(&[1.0, 3.0]);
        assert!((slope - 2.0).abs() < 1e-12);
    }

    // ── classify ──────────────────────────────────────────────────────────────

    #[test]
    fn test_classify_gainer() {
        // slope 0.1 → 10% per period, above the 5% threshold.
        assert_eq!(Trend::classify(0.1, DEFAULT_TREND_THRESHOLD), Trend::Gainer);
    }

    #[test]
    fn test_classify_loser() {
        assert_eq!(Trend::classify(-0.1, DEFAULT_TREND_THRESHOLD), Trend::Loser);
    }

    #[test]
    fn test_classify_neutral_within_threshold() {
        assert_eq!(Trend::classify(0.04, DEFAULT_TREND_THRESHOLD), Trend::Neutral);
        assert_eq!(Trend::classify(-0.04, DEFAULT_TREND_THRESHOLD), Trend::Neutral);
        assert_eq!(Trend::classify(0.0, DEFAULT_TREND_THRESHOLD), Trend::Neutral);
    }

    #[test]
    fn test_classify_exact_threshold_is_neutral() {
        // Classification is strict: exactly 5% is not a gainer.
        assert_eq!(Trend::classify(0.05, DEFAULT_TREND_THRESHOLD), Trend::Neutral);
    }

    #[test]
    fn test_classify_custom_threshold() {
        assert_eq!(Trend::classify(0.02, 1.0), Trend::Gainer);
        assert_eq!(Trend::classify(0.02, 10.0), Trend::Neutral);
    }
}
