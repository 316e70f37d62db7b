//! Chunkwise Extractor
//!
//! Runs structured extraction over ordered input too large for one model
//! call: the input is split into bounded chunks, each chunk is rendered into
//! a prompt and sent to a schema-constrained generator, and the per-chunk
//! outcomes are aggregated in chunk order.
//!
//! # Architecture
//!
//! ```text
//! Input → Chunker → [PromptBuilder → StructuredGenerator] per chunk → AggregateReport
//! ```
//!
//! # Key Features
//!
//! - **Chunking**: fixed unit count or greedy token budget, lines or pages
//! - **Prompt templates**: `{context}`, `{schema}`, `{content}` plus caller variables
//! - **Schema enforcement**: only values that validate become results
//! - **Failure isolation**: a failed chunk is recorded and the run continues
//! - **Bounded concurrency**: optional parallel calls, results still in order
//! - **Cancellation**: stop dispatching, keep what finished
//!
//! # Example Usage
//!
//! ```no_run
//! use chunkwise_domain::SchemaDescriptor;
//! use chunkwise_extractor::{CancelHandle, Extractor, ExtractorConfig, PromptVars, SchemaGenerator};
//! use chunkwise_extractor::chunking::split_lines;
//! use chunkwise_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new(r#"{"summary": "all quiet"}"#);
//! let extractor = Extractor::new(SchemaGenerator::new(llm), ExtractorConfig::default())?;
//!
//! let schema = SchemaDescriptor::from_json(
//!     r#"{"name": "Summary", "fields": [{"name": "summary", "type": "string"}]}"#,
//! )?;
//! let input = split_lines("GET / 200\nGET /admin 403\n");
//!
//! let run = extractor
//!     .run(&input, &schema, &PromptVars::new(), &CancelHandle::new())
//!     .await?;
//!
//! println!("{}", run.report.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod generator;
mod parser;
mod prompt;
mod types;

pub mod chunking;
pub mod export;


pub use config::{ChunkStrategy, ExtractorConfig, UnitKind};
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use generator::SchemaGenerator;
pub use parser::{extract_json, parse_structured_response};
pub use prompt::{
    build_prompt, PromptBuilder, PromptTemplate, PromptVars, CONTENT_PLACEHOLDER,
    CONTEXT_PLACEHOLDER, DEFAULT_TEMPLATE, SCHEMA_PLACEHOLDER,
};
pub use types::{CancelHandle, ExtractionRun, RunMetadata};
