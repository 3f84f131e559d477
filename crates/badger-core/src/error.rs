use thiserror::Error;

/// All errors produced by Badger.
///
/// Per-record problems (missing columns, unparseable numbers, unknown
/// publishers) are absorbed at the ingestion layer with safe defaults and
/// never surface here; only a total failure to obtain a batch from the BI
/// service is a hard error.
#[derive(Error, Debug)]
pub enum BadgerError {
    /// The BI query service could not be reached or returned an error status.
    #[error("BI query failed: {0}")]
    Query(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A query result did not have the expected columns/rows shape.
    #[error("Unexpected result shape: {0}")]
    ResultShape(String),

    /// A period key string is not of the form `"YYYY-MM"`.
    #[error("Invalid period key: {0}")]
    InvalidPeriod(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The export table could not be serialised or written.
    #[error("Export failed: {0}")]
    Export(String),

    /// Pass-through for raw I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the badger crates.
pub type Result<T> = std::result::Result<T, BadgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_query() {
        let err = BadgerError::Query("connection refused".to_string());
        assert_eq!(err.to_string(), "BI query failed: connection refused");
    }

    #[test]
    fn test_error_display_result_shape() {
        let err = BadgerError::ResultShape("missing data.cols".to_string());
        assert_eq!(err.to_string(), "Unexpected result shape: missing data.cols");
    }

    #[test]
    fn test_error_display_invalid_period() {
        let err = BadgerError::InvalidPeriod("2024/01".to_string());
        assert_eq!(err.to_string(), "Invalid period key: 2024/01");
    }

    #[test]
    fn test_error_display_config() {
        let err = BadgerError::Config("missing api key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing api key");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: BadgerError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BadgerError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
