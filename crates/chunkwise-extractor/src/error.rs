//! Error types for the Extractor

use chunkwise_domain::ConfigurationError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run or an export
///
/// Chunk-level failures are never reported here; they are recorded in the
/// run's report.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Invalid setup, detected before any generation call
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Reading input or writing an output artifact failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractorError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractorError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised before any work started
    pub fn is_configuration(&self) -> bool {
        matches!(self, ExtractorError::Configuration(_))
    }
}
