//! Chunkwise Domain Layer
//!
//! Core data model for chunked structured extraction: the units a run reads,
//! the chunks it submits, the schema contract results must satisfy, and the
//! per-chunk outcomes a run produces.
//!
//! ## Key Concepts
//!
//! - **InputUnit**: one log line or document page, immutable once read
//! - **Chunk**: a contiguous, bounded slice of input units with a position index
//! - **SchemaDescriptor**: field name → {type, required, constraints}
//! - **ChunkOutcome**: the success value or the failure recorded for one chunk
//! - **AggregateReport**: every chunk outcome of a run, in chunk order
//!
//! ## Architecture
//!
//! - Pure data and validation logic only, no I/O
//! - Trait definitions for the generation backends
//! - Infrastructure implementations live in `chunkwise-llm` and
//!   `chunkwise-extractor`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod error;
pub mod outcome;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use chunk::{Chunk, InputUnit};
pub use error::{ChunkError, ConfigurationError, GenerationError, GenerationErrorKind, TemplateError};
pub use outcome::{AggregateReport, ChunkOutcome, ExtractionResult, ReportSummary};
pub use schema::{Constraints, FieldDef, FieldType, SchemaDescriptor, Violation};
pub use traits::{LlmProvider, StructuredGenerator};
