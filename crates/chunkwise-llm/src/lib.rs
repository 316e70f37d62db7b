//! Chunkwise LLM Provider Layer
//!
//! Pluggable LLM provider implementations.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from
//! `chunkwise-domain`. Providers return raw text; turning that text into a
//! schema-conforming result is the extractor's job.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing, with failure injection
//! - `OllamaProvider`: Local Ollama API integration with JSON-schema output
//!
//! # Examples
//!
//! ```
//! use chunkwise_llm::MockProvider;
//! use chunkwise_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod mock;
pub mod ollama;

use chunkwise_domain::{GenerationError, GenerationErrorKind};
use thiserror::Error;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Prompt does not fit the model's context window
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// The backend did not answer in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl From<LlmError> for GenerationError {
    fn from(e: LlmError) -> Self {
        let kind = match &e {
            LlmError::Communication(_)
            | LlmError::RateLimitExceeded
            | LlmError::ModelNotAvailable(_) => GenerationErrorKind::BackendUnavailable,
            LlmError::InvalidResponse(_) => GenerationErrorKind::SchemaViolation,
            LlmError::ContextLengthExceeded(_) => GenerationErrorKind::ContextLengthExceeded,
            LlmError::Timeout(_) => GenerationErrorKind::Timeout,
            LlmError::Other(_) => GenerationErrorKind::Other,
        };
        GenerationError::new(kind, e.to_string())
    }
}
