//! Schema-enforcing adapter over a text LLM provider

use crate::parser::parse_structured_response;
use chunkwise_domain::traits::{LlmProvider, StructuredGenerator};
use chunkwise_domain::{ExtractionResult, GenerationError, SchemaDescriptor};
use tracing::debug;

/// Turns any [`LlmProvider`] into a [`StructuredGenerator`]
///
/// The provider is asked for output constrained by the JSON Schema of the
/// descriptor. Whatever comes back is parsed and validated; only values that
/// pass validation are returned.
///
/// # Examples
///
/// ```
/// use chunkwise_domain::traits::StructuredGenerator;
/// use chunkwise_domain::SchemaDescriptor;
/// use chunkwise_extractor::SchemaGenerator;
/// use chunkwise_llm::MockProvider;
///
/// let schema = SchemaDescriptor::from_json(
///     r#"{"name": "S", "fields": [{"name": "summary", "type": "string"}]}"#,
/// ).unwrap();
/// let generator = SchemaGenerator::new(MockProvider::new(r#"{"summary": "ok"}"#));
///
/// let value = generator.generate("prompt", &schema).unwrap();
/// assert_eq!(value["summary"], "ok");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaGenerator<L> {
    llm: L,
}

impl<L> SchemaGenerator<L>
where
    L: LlmProvider,
    L::Error: Into<GenerationError>,
{
    /// Wrap a provider
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &L {
        &self.llm
    }
}

impl<L> StructuredGenerator for SchemaGenerator<L>
where
    L: LlmProvider,
    L::Error: Into<GenerationError>,
{
    fn generate(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<ExtractionResult, GenerationError> {
        let json_schema = schema.to_json_schema().to_string();

        debug!("Prompt length: {} chars", prompt.len());
        let response = self
            .llm
            .generate_structured(prompt, &json_schema)
            .map_err(Into::into)?;
        debug!("LLM response length: {} chars", response.len());

        parse_structured_response(&response, schema)
    }

    fn model_name(&self) -> &str {
        self.llm.model_name()
    }
}
