//! Core Extractor implementation

use crate::chunking::Chunker;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::prompt::{PromptBuilder, PromptTemplate, PromptVars};
use crate::types::{CancelHandle, ExtractionRun, RunMetadata};
use chunkwise_domain::traits::StructuredGenerator;
use chunkwise_domain::{
    AggregateReport, ChunkError, ConfigurationError, ExtractionResult, GenerationError,
    GenerationErrorKind, InputUnit, SchemaDescriptor,
};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Runs chunked structured extraction over ordered input
///
/// The generator is shared by every call of a run. Chunk-level failures are
/// recorded in the report; only configuration problems stop a run.
pub struct Extractor<G> {
    generator: Arc<G>,
    template: PromptTemplate,
    config: ExtractorConfig,
}

/// Per-call limits copied into each dispatched task
#[derive(Debug, Clone, Copy)]
struct CallPolicy {
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl CallPolicy {
    fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            timeout: config.chunk_timeout(),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl<G> Extractor<G>
where
    G: StructuredGenerator + Send + Sync + 'static,
{
    /// Create a new Extractor using the built-in prompt template
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if `config` is invalid or the template
    /// lacks a required placeholder.
    pub fn new(generator: G, config: ExtractorConfig) -> Result<Self, ConfigurationError> {
        Self::with_template(generator, config, PromptTemplate::default_template())
    }

    /// Create a new Extractor with a specific prompt template
    pub fn with_template(
        generator: G,
        config: ExtractorConfig,
        template: PromptTemplate,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        template.require(&config.required_placeholders)?;
        Ok(Self {
            generator: Arc::new(generator),
            template,
            config,
        })
    }

    /// The configuration of this extractor
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The generator shared by every call
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Analyze `input` chunk by chunk
    ///
    /// Returns one outcome per chunk, in chunk order, whatever order calls
    /// complete in. Chunks left undispatched after `cancel` fires are recorded
    /// as `cancelled` failures.
    ///
    /// # Errors
    ///
    /// Only configuration errors (invalid chunking parameters, malformed
    /// schema), raised before any generation call.
    pub async fn run(
        &self,
        input: &[InputUnit],
        schema: &SchemaDescriptor,
        vars: &PromptVars,
        cancel: &CancelHandle,
    ) -> Result<ExtractionRun, ExtractorError> {
        let start_time = Instant::now();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        schema.check()?;
        let chunks = Chunker::from_config(&self.config).chunk(input)?;

        info!(
            "Starting extraction: {} units in {} chunks ({}), {} in flight",
            input.len(),
            chunks.len(),
            self.config.chunk_strategy.as_str(),
            self.config.max_in_flight
        );

        let builder = PromptBuilder::new(&self.template, schema, vars)
            .with_tagged_units(self.config.tag_units);
        let schema = Arc::new(schema.clone());
        let policy = CallPolicy::from_config(&self.config);
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));

        let mut slots: Vec<Option<Result<ExtractionResult, ChunkError>>> = vec![None; chunks.len()];
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        for chunk in &chunks {
            if cancel.is_cancelled() {
                break;
            }

            let prompt = match builder.build(chunk) {
                Ok(prompt) => prompt,
                Err(e) => {
                    warn!("Chunk {} failed to render: {}", chunk.index, e);
                    slots[chunk.index] = Some(Err(e.into()));
                    dispatched += 1;
                    continue;
                }
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            debug!("Dispatching chunk {}/{} ({} units)", chunk.index + 1, chunks.len(), chunk.len());

            let call = ChunkCall {
                generator: Arc::clone(&self.generator),
                schema: Arc::clone(&schema),
                semaphore: Arc::clone(&semaphore),
                policy,
                cancel: cancel.clone(),
                index: chunk.index,
            };
            tasks.spawn(async move {
                let index = call.index;
                (index, generate_chunk(call, prompt, permit).await)
            });
            dispatched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(e) = &result {
                        warn!("Chunk {} failed: {}", index, e);
                    }
                    // Each slot is written once
                    if slots[index].is_none() {
                        slots[index] = Some(result.map_err(ChunkError::from));
                    }
                }
                Err(e) => warn!("Extraction task failed: {}", e),
            }
        }

        let cancelled = dispatched < chunks.len();
        if cancelled {
            info!("Run cancelled: {} of {} chunks never dispatched", chunks.len() - dispatched, chunks.len());
        }

        let report = AggregateReport::aggregate(slots.into_iter().enumerate().map(|(index, slot)| {
            let result = slot.unwrap_or_else(|| {
                let error = if index >= dispatched {
                    GenerationError::cancelled()
                } else {
                    GenerationError::new(GenerationErrorKind::Other, "generation task did not complete")
                };
                Err(error.into())
            });
            (index, result)
        }));

        let summary = report.summary();
        info!("Extraction complete: {}", summary);

        Ok(ExtractionRun {
            report,
            metadata: RunMetadata {
                model_name: self.generator.model_name().to_string(),
                chunk_count: chunks.len(),
                chunk_strategy: self.config.chunk_strategy.as_str().to_string(),
                timestamp,
                processing_time_ms: start_time.elapsed().as_millis() as u64,
                cancelled,
            },
        })
    }
}

/// Everything one chunk's task shares with the run
struct ChunkCall<G> {
    generator: Arc<G>,
    schema: Arc<SchemaDescriptor>,
    semaphore: Arc<Semaphore>,
    policy: CallPolicy,
    cancel: CancelHandle,
    index: usize,
}

/// Generate one chunk's result, retrying per the call policy
///
/// `permit` covers the first attempt; each retry waits for a fresh one.
async fn generate_chunk<G>(
    call: ChunkCall<G>,
    prompt: String,
    permit: OwnedSemaphorePermit,
) -> Result<ExtractionResult, GenerationError>
where
    G: StructuredGenerator + Send + Sync + 'static,
{
    let ChunkCall {
        generator,
        schema,
        semaphore,
        policy,
        cancel,
        index,
    } = call;
    let prompt: Arc<str> = prompt.into();
    let mut permit = permit;
    let mut attempt = 0;

    loop {
        let outcome = call_generator(
            Arc::clone(&generator),
            Arc::clone(&prompt),
            Arc::clone(&schema),
            policy.timeout,
            permit,
        )
        .await;

        match outcome {
            Ok(value) => {
                debug!("Chunk {} analyzed", index);
                return Ok(value);
            }
            Err(e) if attempt < policy.max_retries && e.kind.is_retryable() && !cancel.is_cancelled() => {
                attempt += 1;
                let delay = policy.backoff_for(attempt);
                warn!(
                    "Chunk {} attempt {} failed ({}), retrying in {}ms",
                    index,
                    attempt,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;

                permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(e),
                    acquired = Arc::clone(&semaphore).acquire_owned() => match acquired {
                        Ok(acquired) => acquired,
                        Err(_) => return Err(e),
                    },
                };
            }
            Err(e) => return Err(e),
        }
    }
}

/// Call the generator once, bounded by `deadline`
///
/// A timeout is reported as soon as the deadline passes, but `permit` stays
/// with the blocking call until the backend actually returns, so an abandoned
/// call still counts against `max_in_flight`.
async fn call_generator<G>(
    generator: Arc<G>,
    prompt: Arc<str>,
    schema: Arc<SchemaDescriptor>,
    deadline: Duration,
    permit: OwnedSemaphorePermit,
) -> Result<ExtractionResult, GenerationError>
where
    G: StructuredGenerator + Send + Sync + 'static,
{
    // Call in a blocking context since StructuredGenerator is not async
    let call = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        generator.generate(&prompt, &schema)
    });

    match timeout(deadline, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(GenerationError::new(
            GenerationErrorKind::Other,
            format!("Task join error: {}", e),
        )),
        Err(_) => Err(GenerationError::timeout(format!(
            "no response within {}s",
            deadline.as_secs_f64()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SchemaGenerator;
    use chunkwise_llm::MockProvider;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::from_json(r#"{"name": "S", "fields": [{"name": "summary", "type": "string"}]}"#)
            .unwrap()
    }

    fn create_test_extractor(config: ExtractorConfig) -> Extractor<SchemaGenerator<MockProvider>> {
        let llm = MockProvider::new(r#"{"summary": "nothing unusual"}"#);
        Extractor::new(SchemaGenerator::new(llm), config).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let config = ExtractorConfig {
            chunk_size: 0,
            ..ExtractorConfig::default()
        };
        let result = Extractor::new(SchemaGenerator::new(MockProvider::default()), config);
        assert!(matches!(result, Err(ConfigurationError::InvalidChunkSize(0))));
    }

    #[test]
    fn test_template_without_content_is_rejected() {
        let template = PromptTemplate::parse("{context} {schema}").unwrap();
        let result = Extractor::with_template(
            SchemaGenerator::new(MockProvider::default()),
            ExtractorConfig::default(),
            template,
        );
        assert!(matches!(result, Err(ConfigurationError::Template(_))));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = CallPolicy {
            timeout: Duration::from_secs(1),
            max_retries: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_extract_single_chunk() {
        let extractor = create_test_extractor(ExtractorConfig::default());
        let input: Vec<InputUnit> = vec!["one".to_string(), "two".to_string()];

        let run = extractor
            .run(&input, &schema(), &PromptVars::new(), &CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(run.report.len(), 1);
        assert_eq!(run.metadata.chunk_count, 1);
        assert_eq!(run.metadata.model_name, "mock");
        assert_eq!(run.metadata.chunk_strategy, "by_count");
        assert!(!run.metadata.cancelled);
        assert_eq!(extractor.generator().provider().call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_schema_is_configuration_error() {
        let extractor = create_test_extractor(ExtractorConfig::default());
        let bad = SchemaDescriptor {
            name: "Empty".to_string(),
            description: None,
            fields: Vec::new(),
        };

        let result = extractor
            .run(&["x".to_string()], &bad, &PromptVars::new(), &CancelHandle::new())
            .await;
        assert!(matches!(result, Err(ExtractorError::Configuration(_))));
        assert_eq!(extractor.generator().provider().call_count(), 0);
    }
}
