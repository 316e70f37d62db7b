//! Error types for the CLI application.

use chunkwise_domain::ConfigurationError;
use chunkwise_extractor::ExtractorError;
use chunkwise_llm::LlmError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for a completed run (chunk failures included).
pub const EXIT_OK: i32 = 0;

/// Exit code for runtime failures such as an unwritable output file.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for invalid setup detected before any work.
pub const EXIT_CONFIGURATION: i32 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// CLI configuration error (profiles, settings file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid extraction setup
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Extraction or export error
    #[error("{0}")]
    Extractor(#[from] ExtractorError),

    /// Backend client error
    #[error("Backend error: {0}")]
    Llm(#[from] LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Operation not permitted
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Configuration(_) | CliError::Toml(_) => EXIT_CONFIGURATION,
            CliError::Extractor(e) if e.is_configuration() => EXIT_CONFIGURATION,
            _ => EXIT_FAILURE,
        }
    }
}
