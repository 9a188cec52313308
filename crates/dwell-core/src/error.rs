use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the dwell analyzer.
#[derive(Error, Debug)]
pub enum DwellError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV layer rejected the input as a whole.
    #[error("Failed to parse CSV: {0}")]
    Csv(String),

    /// A single row could not be turned into a log record.
    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    /// A column the analysis cannot run without is absent from the header.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A filter or session selection matched nothing.
    #[error("No matching data: {0}")]
    NoMatchingData(String),

    /// A date/time pair did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// The input path does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No CSV files were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the dwell crates.
pub type Result<T> = std::result::Result<T, DwellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = DwellError::FileRead {
            path: PathBuf::from("/some/log.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/log.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_malformed_row() {
        let err = DwellError::MalformedRow {
            line: 7,
            reason: "expected 24 fields, found 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed row at line 7: expected 24 fields, found 3"
        );
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = DwellError::MissingColumn("session_id".to_string());
        assert_eq!(err.to_string(), "Missing required column: session_id");
    }

    #[test]
    fn test_error_display_no_matching_data() {
        let err = DwellError::NoMatchingData("session 42 has no events".to_string());
        assert_eq!(err.to_string(), "No matching data: session 42 has no events");
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = DwellError::TimestampParse("2024-13-01 99:00".to_string());
        assert_eq!(err.to_string(), "Invalid timestamp format: 2024-13-01 99:00");
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = DwellError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No CSV files found in /empty/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = DwellError::Config("top-k must be positive".to_string());
        assert_eq!(err.to_string(), "Configuration error: top-k must be positive");
    }
}
