//! Trait definitions for generation backends
//!
//! These traits define the boundary between the extraction loop and whatever
//! serves the model. Implementations live in other crates.

use crate::error::GenerationError;
use crate::outcome::ExtractionResult;
use crate::schema::SchemaDescriptor;

/// Trait for text-level LLM provider operations
///
/// Implemented by the infrastructure layer (chunkwise-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate output constrained by a JSON Schema (if the backend supports it)
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;

    /// Identifier of the model serving requests
    fn model_name(&self) -> &str {
        "llm"
    }
}

/// Trait for producing schema-conforming values
///
/// A successful return must validate against `schema`. Implementations turn
/// malformed or non-conforming responses into a [`GenerationError`] instead
/// of returning a partially-typed value.
///
/// Implemented by the application layer (chunkwise-extractor)
pub trait StructuredGenerator {
    /// Produce one result for `prompt`
    fn generate(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<ExtractionResult, GenerationError>;

    /// Identifier of the model behind this generator
    fn model_name(&self) -> &str;
}
