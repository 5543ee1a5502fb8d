use std::path::PathBuf;
use thiserror::Error;

/// The main error type for linecount operations.
///
/// These are run-level failures: configuration that cannot be used, input
/// files that cannot be read, reports that cannot be written. Problems with
/// a single observation are reported as
/// [`ObservationWarning`](crate::counting::ObservationWarning) instead and
/// never abort a frame.
#[derive(Debug, Error)]
pub enum LinecountError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid line configuration: {0}")]
    InvalidLineConfiguration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize config: {0}")]
    ConfigWrite(#[source] serde_yaml::Error),

    #[error("Failed to parse tracks CSV from {path}: {source}")]
    TracksCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid tracks CSV {path}: {message}")]
    TracksCsvInvalid { path: PathBuf, message: String },

    #[error("Failed to parse tracks JSON from {path}: {source}")]
    TracksJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write report to {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to serialize summary: {0}")]
    SummaryJson(#[source] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Run produced {warning_count} warning(s) in strict mode")]
    StrictWarnings { warning_count: usize },
}
