//! Result and error types for C3.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for C3 operations
pub type C3Result<T> = Result<T, C3Error>;

/// Errors that can occur while collecting or reporting coverage
#[derive(Debug, Error)]
pub enum C3Error {
    /// Config file missing, unreadable or invalid, unknown suite, bad filter pattern
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Exclusive lock on the persisted snapshot could not be obtained
    #[error("Failed to acquire write-lock for {}: {source}", path.display())]
    LockAcquisition {
        /// Snapshot path
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Working or report directory could not be created
    #[error("Failed to create directory \"{}\": {source}", path.display())]
    DirectoryCreation {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A report writer failed, or the format is unsupported by the installed writers
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },

    /// The error log itself could not be written
    #[error("Could not write error to log file ({}), original message: {message}", path.display())]
    WritePermission {
        /// Error log path
        path: PathBuf,
        /// The message that was meant for the log
        message: String,
    },

    /// Persisted snapshot is not a valid serialization
    #[error("Corrupt coverage snapshot {}: {source}", path.display())]
    CorruptSnapshot {
        /// Snapshot path
        path: PathBuf,
        /// Decode error
        #[source]
        source: serde_json::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl C3Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }

    /// Create a directory creation error
    #[must_use]
    pub fn directory_creation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreation {
            path: path.into(),
            source,
        }
    }

    /// Create a lock acquisition error
    #[must_use]
    pub fn lock_acquisition(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LockAcquisition {
            path: path.into(),
            source,
        }
    }
}
