//! Configuration for the Extractor

use chunkwise_domain::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How input units are grouped into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// At most `chunk_size` units per chunk
    #[default]
    ByCount,
    /// Greedy packing up to `token_budget` estimated tokens per chunk
    ByTokenBudget,
}

impl ChunkStrategy {
    /// Short name used in run metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::ByCount => "by_count",
            ChunkStrategy::ByTokenBudget => "by_token_budget",
        }
    }
}

/// What one input unit is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// One log line
    #[default]
    Line,
    /// One document page, pages separated by a `---` line
    Page,
}

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Chunking strategy
    pub chunk_strategy: ChunkStrategy,

    /// Maximum units per chunk (`by_count`)
    pub chunk_size: usize,

    /// Maximum estimated tokens per chunk (`by_token_budget`)
    pub token_budget: usize,

    /// How raw input is split into units
    pub unit_kind: UnitKind,

    /// Prefix each unit in the prompt with a `LOGID-XX` tag
    pub tag_units: bool,

    /// Placeholders every template must contain
    pub required_placeholders: Vec<String>,

    /// Maximum concurrent generation calls
    pub max_in_flight: usize,

    /// Deadline for one chunk's generation call (seconds)
    pub chunk_timeout_secs: u64,

    /// Extra attempts per chunk after a failed generation call
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds), doubled per attempt
    pub retry_backoff_ms: u64,
}

impl ExtractorConfig {
    /// Get the per-chunk timeout as a Duration
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self.chunk_strategy {
            ChunkStrategy::ByCount if self.chunk_size == 0 => {
                return Err(ConfigurationError::InvalidChunkSize(self.chunk_size));
            }
            ChunkStrategy::ByTokenBudget if self.token_budget == 0 => {
                return Err(ConfigurationError::InvalidTokenBudget(self.token_budget));
            }
            _ => {}
        }
        if self.max_in_flight == 0 {
            return Err(ConfigurationError::Invalid(
                "max_in_flight must be greater than 0".to_string(),
            ));
        }
        if self.chunk_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "chunk_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.required_placeholders.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigurationError::Invalid(
                "required_placeholders must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Sequential run, 20 lines per chunk
    fn default() -> Self {
        Self {
            chunk_strategy: ChunkStrategy::ByCount,
            chunk_size: 20,
            token_budget: 4096,
            unit_kind: UnitKind::Line,
            tag_units: false,
            required_placeholders: vec![
                "context".to_string(),
                "schema".to_string(),
                "content".to_string(),
            ],
            max_in_flight: 1,
            chunk_timeout_secs: 120,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: larger chunks, parallel calls, short deadline
    pub fn aggressive() -> Self {
        Self {
            chunk_size: 50,
            token_budget: 8192,
            max_in_flight: 4,
            chunk_timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Lenient preset: small chunks, long deadline, retries
    pub fn lenient() -> Self {
        Self {
            chunk_size: 10,
            token_budget: 2048,
            chunk_timeout_secs: 300,
            max_retries: 2,
            retry_backoff_ms: 1000,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    ///
    /// Missing keys take their default values.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(toml_str)
            .map_err(|e| ConfigurationError::Invalid(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigurationError::Invalid(format!("Failed to serialize to TOML: {}", e)))
    }
}
