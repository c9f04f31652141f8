use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the timesheet pipeline.
#[derive(Error, Debug)]
pub enum TimesheetError {
    /// The timesheet export does not exist on disk.
    #[error("Source file not found: {0}")]
    MissingSourceFile(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The JSON parsed but does not have the expected `{"data": [...]}` shape.
    #[error("Invalid timesheet document: {0}")]
    InvalidDocument(String),

    /// A record is missing a required key field or carries the wrong type.
    #[error("Malformed record #{index}: field '{field}' {reason}")]
    MalformedRecord {
        index: usize,
        field: &'static str,
        reason: String,
    },

    /// Writing the CSV export failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the timesheet crates.
pub type Result<T> = std::result::Result<T, TimesheetError>;

/// Non-fatal signal that the active filters matched no aggregated rows.
///
/// Consumers keep rendering; metrics over the empty set report zero counts
/// and no top project.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No rows match project={project} employee={employee}")]
pub struct EmptyResultWarning {
    pub project: String,
    pub employee: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_source() {
        let err = TimesheetError::MissingSourceFile(PathBuf::from("/tmp/data.json"));
        assert_eq!(err.to_string(), "Source file not found: /tmp/data.json");
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = TimesheetError::FileRead {
            path: PathBuf::from("/some/data.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/data.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_display_malformed_record() {
        let err = TimesheetError::MalformedRecord {
            index: 4,
            field: "Client",
            reason: "is missing".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed record #4: field 'Client' is missing");
    }

    #[test]
    fn test_error_display_invalid_document() {
        let err = TimesheetError::InvalidDocument("missing 'data' array".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid timesheet document: missing 'data' array"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = TimesheetError::Config("label limit must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: label limit must be positive"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: TimesheetError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: TimesheetError = io_err.into();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_empty_result_warning_display() {
        let warning = EmptyResultWarning {
            project: "P9".to_string(),
            employee: "all".to_string(),
        };
        assert_eq!(warning.to_string(), "No rows match project=P9 employee=all");
    }
}
