//! Error taxonomy for extraction runs
//!
//! Configuration errors are fatal and raised before any generation call.
//! Template and generation errors are chunk-level: they are recorded against
//! the chunk that produced them and the run continues.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal errors detected before any chunk is submitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Chunk size below 1
    #[error("Chunk size must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    /// Token budget below 1
    #[error("Token budget must be at least 1, got {0}")]
    InvalidTokenBudget(usize),

    /// A required input, template or schema file does not exist
    #[error("File not found: {0}")]
    MissingFile(String),

    /// The prompt template cannot serve any chunk
    #[error("Invalid prompt template: {0}")]
    Template(#[from] TemplateError),

    /// The schema descriptor is malformed
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Any other invalid setting
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Prompt rendering failures
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateError {
    /// A required placeholder does not appear in the template
    #[error("template is missing required placeholder '{{{name}}}'")]
    MissingPlaceholder {
        /// Placeholder name, without braces
        name: String,
    },

    /// The template references a placeholder with no value
    #[error("no value for placeholder '{{{name}}}'")]
    UnknownPlaceholder {
        /// Placeholder name, without braces
        name: String,
    },

    /// A `{` or `}` that is neither a placeholder delimiter nor escaped
    #[error("unbalanced brace at byte {position}")]
    UnbalancedBrace {
        /// Byte offset of the offending brace
        position: usize,
    },
}

/// Classification of structured generation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    /// The call did not finish within the per-chunk timeout
    Timeout,

    /// The response was not valid JSON or did not match the schema
    SchemaViolation,

    /// The backend could not be reached or the model is not loaded
    BackendUnavailable,

    /// The prompt did not fit the model's context window
    ContextLengthExceeded,

    /// The run was cancelled before this chunk was submitted
    Cancelled,

    /// Anything the backend reported that fits no other kind
    Other,
}

impl GenerationErrorKind {
    /// Stable lowercase name, as used in serialized reports
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationErrorKind::Timeout => "timeout",
            GenerationErrorKind::SchemaViolation => "schema_violation",
            GenerationErrorKind::BackendUnavailable => "backend_unavailable",
            GenerationErrorKind::ContextLengthExceeded => "context_length_exceeded",
            GenerationErrorKind::Cancelled => "cancelled",
            GenerationErrorKind::Other => "other",
        }
    }

    /// Whether another attempt at the same chunk could succeed
    ///
    /// A prompt that overflowed the context window overflows it again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GenerationErrorKind::Cancelled | GenerationErrorKind::ContextLengthExceeded
        )
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured generation call failed for one chunk
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    /// Failure classification
    pub kind: GenerationErrorKind,

    /// Human-readable detail from the backend or validator
    pub message: String,
}

impl GenerationError {
    /// Create a generation error of the given kind
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The per-chunk deadline expired
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Timeout, message)
    }

    /// The response did not conform to the schema
    pub fn schema_violation(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::SchemaViolation, message)
    }

    /// The backend could not serve the request
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::BackendUnavailable, message)
    }

    /// The run stopped before the chunk was submitted
    pub fn cancelled() -> Self {
        Self::new(GenerationErrorKind::Cancelled, "run cancelled before dispatch")
    }
}

/// Why a single chunk could not be analyzed
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "detail", rename_all = "snake_case")]
pub enum ChunkError {
    /// The prompt for this chunk could not be rendered
    #[error("template error: {0}")]
    Template(TemplateError),

    /// The generator failed or returned a non-conforming value
    #[error("generation error: {0}")]
    Generation(GenerationError),
}

impl ChunkError {
    /// Generation error kind, if this failure came from the generator
    pub fn generation_kind(&self) -> Option<GenerationErrorKind> {
        match self {
            ChunkError::Generation(e) => Some(e.kind),
            ChunkError::Template(_) => None,
        }
    }
}

impl From<TemplateError> for ChunkError {
    fn from(e: TemplateError) -> Self {
        ChunkError::Template(e)
    }
}

impl From<GenerationError> for ChunkError {
    fn from(e: GenerationError) -> Self {
        ChunkError::Generation(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_messages_show_braces() {
        let e = TemplateError::MissingPlaceholder {
            name: "content".to_string(),
        };
        assert_eq!(e.to_string(), "template is missing required placeholder '{content}'");
    }

    #[test]
    fn test_generation_error_display() {
        let e = GenerationError::timeout("exceeded 120s");
        assert_eq!(e.to_string(), "timeout: exceeded 120s");
    }

    #[test]
    fn test_cancelled_and_overflow_are_not_retryable() {
        assert!(!GenerationErrorKind::Cancelled.is_retryable());
        assert!(!GenerationErrorKind::ContextLengthExceeded.is_retryable());
        assert!(GenerationErrorKind::Timeout.is_retryable());
        assert!(GenerationErrorKind::SchemaViolation.is_retryable());
    }

    #[test]
    fn test_chunk_error_serialized_shape() {
        let e = ChunkError::Generation(GenerationError::schema_violation("missing field 'summary'"));
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["stage"], "generation");
        assert_eq!(json["detail"]["kind"], "schema_violation");

        let back: ChunkError = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_template_chunk_error_round_trip() {
        let e = ChunkError::from(TemplateError::UnknownPlaceholder {
            name: "host".to_string(),
        });
        let json = serde_json::to_string(&e).unwrap();
        let back: ChunkError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
        assert_eq!(back.generation_kind(), None);
    }
}
