//! Unit conversion and number formatting.
//!
//! All byte conversions are base-1000 (decimal), never base-1024; the chart,
//! table and export views must agree on this.

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert raw bytes to gigabytes (base-1000), rounded to two decimals.
///
/// # Examples
///
/// ```
/// use badger_core::units::gigabytes;
///
/// assert_eq!(gigabytes(2_000_000_000.0), 2.00);
/// assert_eq!(gigabytes(0.0), 0.0);
/// assert_eq!(gigabytes(1_555_000_000.0), 1.56);
/// ```
pub fn gigabytes(bytes: f64) -> f64 {
    round2(bytes / 1_000_000_000.0)
}

/// Convert raw bytes to terabytes (base-1000), rounded to two decimals.
pub fn terabytes(bytes: f64) -> f64 {
    round2(bytes / 1_000_000_000_000.0)
}

/// Format a count with thousands separators, e.g. `1234567.0` → `"1,234,567"`.
///
/// Values are rounded to the nearest integer first; counts are whole numbers
/// upstream.
pub fn format_count(value: f64) -> String {
    let negative = value < 0.0;
    let rounded = value.abs().round() as u64;
    let digits = rounded.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Compact human display for large counts: `1.2B`, `3.4M`, `5.6K`.
pub fn compact_count(value: f64) -> String {
    if value >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{}", value.round() as i64)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── gigabytes / terabytes ─────────────────────────────────────────────────

    #[test]
    fn test_gigabytes_two_billion_bytes() {
        assert_eq!(gigabytes(2_000_000_000.0), 2.00);
    }

    #[test]
    fn test_gigabytes_zero() {
        assert_eq!(gigabytes(0.0), 0.0);
    }

    #[test]
    fn test_gigabytes_rounds_to_two_decimals() {
        assert_eq!(gigabytes(1_555_000_000.0), 1.56);
        assert_eq!(gigabytes(1_234_000_000.0), 1.23);
    }

    #[test]
    fn test_gigabytes_uses_decimal_base() {
        // Base-1024 would give 1.0 here; base-1000 gives ~1.07.
        assert_eq!(gigabytes(1_073_741_824.0), 1.07);
    }

    #[test]
    fn test_terabytes() {
        assert_eq!(terabytes(1_500_000_000_000.0), 1.5);
        assert_eq!(terabytes(0.0), 0.0);
    }

    // ── format_count ──────────────────────────────────────────────────────────

    #[test]
    fn test_format_count_small() {
        assert_eq!(format_count(5.0), "5");
        assert_eq!(format_count(999.0), "999");
    }

    #[test]
    fn test_format_count_thousands() {
        assert_eq!(format_count(1_234.0), "1,234");
        assert_eq!(format_count(1_234_567.0), "1,234,567");
    }

    #[test]
    fn test_format_count_exact_thousand() {
        assert_eq!(format_count(1_000.0), "1,000");
    }

    #[test]
    fn test_format_count_negative() {
        assert_eq!(format_count(-9_876.0), "-9,876");
    }

    #[test]
    fn test_format_count_rounds_fractions() {
        assert_eq!(format_count(1_234.6), "1,235");
    }

    // ── compact_count ─────────────────────────────────────────────────────────

    #[test]
    fn test_compact_count_scales() {
        assert_eq!(compact_count(1_200_000_000.0), "1.2B");
        assert_eq!(compact_count(3_400_000.0), "3.4M");
        assert_eq!(compact_count(5_600.0), "5.6K");
        assert_eq!(compact_count(42.0), "42");
    }
}
