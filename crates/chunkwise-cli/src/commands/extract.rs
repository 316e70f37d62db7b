//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::commands::schema::{load_schema, read_required};
use crate::config::{Config, OutputFormat, Profile};
use crate::error::Result;
use crate::output::Formatter;
use chunkwise_domain::{
    ConfigurationError, FieldType, InputUnit, SchemaDescriptor, StructuredGenerator,
};
use chunkwise_extractor::chunking::{split_units, Chunker};
use chunkwise_extractor::export::{write_csv, write_json};
use chunkwise_extractor::{
    CancelHandle, ChunkStrategy, ExtractionRun, Extractor, ExtractorConfig, PromptTemplate,
    PromptVars, SchemaGenerator, CONTEXT_PLACEHOLDER,
};
use chunkwise_llm::OllamaProvider;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Everything an extraction needs, resolved from flags, files and profile.
#[derive(Debug, Clone)]
pub struct ExtractPlan {
    /// Input units, in order
    pub input: Vec<InputUnit>,
    /// Prompt template
    pub template: PromptTemplate,
    /// Result schema
    pub schema: SchemaDescriptor,
    /// Template variables, `context` included
    pub vars: PromptVars,
    /// Extractor settings after all overrides
    pub config: ExtractorConfig,
    /// Backend endpoint and model
    pub backend: Profile,
    /// JSON artifact path
    pub json: Option<PathBuf>,
    /// CSV artifact path
    pub csv: Option<PathBuf>,
    /// CSV columns
    pub columns: Vec<String>,
}

impl ExtractPlan {
    /// Resolve an extraction plan.
    ///
    /// Extractor settings are layered: preset, then the `--config` file,
    /// then individual flags. Every check that can fail happens here,
    /// before any backend is contacted.
    pub fn resolve(args: &ExtractArgs, config: &Config) -> Result<Self> {
        let mut settings = args.preset.map(ExtractorConfig::from).unwrap_or_default();
        if let Some(path) = &args.config {
            settings = layer_toml(settings, &read_required(path)?, path)?;
        }
        apply_flags(&mut settings, args);
        settings.validate()?;

        let input = split_units(&read_required(&args.input)?, settings.unit_kind);

        let template = match &args.template {
            Some(path) => PromptTemplate::parse(&read_required(path)?).map_err(ConfigurationError::from)?,
            None => PromptTemplate::default_template(),
        };
        template
            .require(&settings.required_placeholders)
            .map_err(ConfigurationError::from)?;

        let schema = load_schema(args.schema.as_deref())?;

        let mut vars: PromptVars = args.vars.iter().cloned().collect();
        if let Some(context) = &args.context {
            vars.insert(CONTEXT_PLACEHOLDER.to_string(), context.clone());
        }

        let mut backend = config.backend_profile()?;
        if let Some(endpoint) = &args.endpoint {
            backend.endpoint = endpoint.clone();
        }
        if let Some(model) = &args.model {
            backend.model = model.clone();
        }

        let columns = if args.columns.is_empty() {
            default_columns(&schema)
        } else {
            args.columns.clone()
        };

        Ok(Self {
            input,
            template,
            schema,
            vars,
            config: settings,
            backend,
            json: args.json.clone(),
            csv: args.csv.clone(),
            columns,
        })
    }
}

/// Execute the extract command against the profile's Ollama backend.
pub fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let plan = ExtractPlan::resolve(&args, config)?;

    let llm = build_provider(&plan)?;
    info!("Using model {} at {}", plan.backend.model, llm.endpoint());

    let extractor = Extractor::with_template(
        SchemaGenerator::new(llm),
        plan.config.clone(),
        plan.template.clone(),
    )?;

    let run = run_extraction(&extractor, &plan)?;
    report(&run, &plan, formatter)
}

/// Build the backend client for a plan.
///
/// One HTTP attempt per call; the extractor's `max_retries` is the only retry policy.
pub fn build_provider(plan: &ExtractPlan) -> Result<OllamaProvider> {
    let mut llm = OllamaProvider::new(&plan.backend.endpoint, &plan.backend.model)?
        .with_request_timeout(plan.config.chunk_timeout())?
        .with_max_retries(1);
    if let Some(max_tokens) = plan.backend.max_tokens {
        llm = llm.with_max_tokens(max_tokens);
    }
    Ok(llm)
}

/// Run `extractor` over the plan on a dedicated runtime.
///
/// Ctrl+C cancels the run: chunks already submitted finish, the rest are
/// recorded as cancelled, and the partial run is returned.
pub fn run_extraction<G>(extractor: &Extractor<G>, plan: &ExtractPlan) -> Result<ExtractionRun>
where
    G: StructuredGenerator + Send + Sync + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let cancel = CancelHandle::new();

    let result = runtime.block_on(async {
        let watcher = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling remaining chunks");
                watcher.cancel();
            }
        });

        let result = extractor.run(&plan.input, &plan.schema, &plan.vars, &cancel).await;
        interrupt.abort();
        result
    });

    // Calls abandoned on timeout may still hold blocking threads
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(result?)
}

/// Print the run, then write the requested artifacts.
///
/// The console report is printed before any artifact is written, so a
/// failed write still leaves the report on screen.
pub fn report(run: &ExtractionRun, plan: &ExtractPlan, formatter: &Formatter) -> Result<()> {
    let chunks = if plan.config.tag_units {
        Chunker::from_config(&plan.config)
            .chunk(&plan.input)
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    println!("{}", formatter.format_run(run, &chunks)?);

    let notify = formatter.format() != OutputFormat::Quiet;
    if let Some(path) = &plan.json {
        write_json(&run.report, path)?;
        if notify {
            eprintln!("{}", formatter.success(&format!("Wrote {}", path.display())));
        }
    }
    if let Some(path) = &plan.csv {
        write_csv(&run.report, &plan.columns, path)?;
        if notify {
            eprintln!("{}", formatter.success(&format!("Wrote {}", path.display())));
        }
    }

    Ok(())
}

fn apply_flags(settings: &mut ExtractorConfig, args: &ExtractArgs) {
    if let Some(size) = args.chunk_size {
        settings.chunk_strategy = ChunkStrategy::ByCount;
        settings.chunk_size = size;
    }
    if let Some(budget) = args.token_budget {
        settings.chunk_strategy = ChunkStrategy::ByTokenBudget;
        settings.token_budget = budget;
    }
    if let Some(unit) = args.unit {
        settings.unit_kind = unit.into();
    }
    if args.tag_units {
        settings.tag_units = true;
    }
    if let Some(n) = args.max_in_flight {
        settings.max_in_flight = n;
    }
    if let Some(secs) = args.timeout {
        settings.chunk_timeout_secs = secs;
    }
    if let Some(retries) = args.retries {
        settings.max_retries = retries;
    }
}

/// Overlay the keys of a TOML settings file on `base`.
fn layer_toml(base: ExtractorConfig, text: &str, path: &Path) -> Result<ExtractorConfig> {
    let overrides: toml::Table = toml::from_str(text).map_err(|e| invalid_settings(path, e))?;
    let mut merged = match toml::Value::try_from(&base).map_err(|e| invalid_settings(path, e))? {
        toml::Value::Table(table) => table,
        _ => toml::Table::new(),
    };
    merged.extend(overrides);

    let layered: ExtractorConfig = toml::Value::Table(merged)
        .try_into()
        .map_err(|e| invalid_settings(path, e))?;
    Ok(layered)
}

fn invalid_settings(path: &Path, e: impl std::fmt::Display) -> ConfigurationError {
    ConfigurationError::Invalid(format!("{}: {}", path.display(), e))
}

/// Scalar top-level fields, in declaration order.
fn default_columns(schema: &SchemaDescriptor) -> Vec<String> {
    schema
        .fields
        .iter()
        .filter(|f| !matches!(f.ty, FieldType::Array { .. } | FieldType::Map { .. } | FieldType::Object { .. }))
        .map(|f| f.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use crate::error::CliError;
    use chunkwise_extractor::UnitKind;
    use clap::Parser;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn workspace() -> TempDir {
        let dir = tempdir().unwrap();
        let lines: Vec<String> = (0..45).map(|i| format!("10.0.0.{} GET /page/{} 200", i % 7, i)).collect();
        fs::write(dir.path().join("access.log"), lines.join("\n")).unwrap();
        dir
    }

    fn args(dir: &TempDir, extra: &[&str]) -> ExtractArgs {
        let input = dir.path().join("access.log");
        let mut argv = vec!["chunkwise", "extract", "--input", input.to_str().unwrap()];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Extract(args) => args,
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let dir = workspace();
        let plan = ExtractPlan::resolve(&args(&dir, &[]), &Config::default()).unwrap();

        assert_eq!(plan.input.len(), 45);
        assert_eq!(plan.config, ExtractorConfig::default());
        assert_eq!(plan.schema.name, "LogAnalysis");
        assert_eq!(plan.backend, Profile::default());
        assert_eq!(
            plan.columns,
            vec!["summary", "highest_severity", "requires_immediate_attention"]
        );
    }

    #[test]
    fn test_flags_override_preset() {
        let dir = workspace();
        let plan = ExtractPlan::resolve(
            &args(
                &dir,
                &["--preset", "aggressive", "--chunk-size", "15", "--retries", "1", "--tag-units"],
            ),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(plan.config.chunk_size, 15);
        assert_eq!(plan.config.max_retries, 1);
        assert_eq!(plan.config.max_in_flight, ExtractorConfig::aggressive().max_in_flight);
        assert!(plan.config.tag_units);
    }

    #[test]
    fn test_provider_makes_one_attempt_per_call() {
        let dir = workspace();
        let plan = ExtractPlan::resolve(&args(&dir, &["--retries", "0"]), &Config::default()).unwrap();
        assert_eq!(plan.config.max_retries, 0);

        let llm = build_provider(&plan).unwrap();
        assert_eq!(llm.max_retries(), 1);
        assert_eq!(llm.endpoint(), plan.backend.endpoint.trim_end_matches('/'));
    }

    #[test]
    fn test_toml_file_layers_over_preset() {
        let dir = workspace();
        let settings = dir.path().join("extract.toml");
        fs::write(&settings, "chunk_size = 7\nunit_kind = \"page\"\n").unwrap();

        let plan = ExtractPlan::resolve(
            &args(&dir, &["--preset", "lenient", "--config", settings.to_str().unwrap()]),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(plan.config.chunk_size, 7);
        assert_eq!(plan.config.unit_kind, UnitKind::Page);
        assert_eq!(plan.config.max_retries, ExtractorConfig::lenient().max_retries);
        // One page: the log has no separators
        assert_eq!(plan.input.len(), 1);
    }

    #[test]
    fn test_zero_chunk_size_is_configuration_error() {
        let dir = workspace();
        let err = ExtractPlan::resolve(&args(&dir, &["--chunk-size", "0"]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::Configuration(ConfigurationError::InvalidChunkSize(0))));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempdir().unwrap();
        let err = ExtractPlan::resolve(&args(&dir, &[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::Configuration(ConfigurationError::MissingFile(_))));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_template_without_content_placeholder() {
        let dir = workspace();
        let template = dir.path().join("prompt.txt");
        fs::write(&template, "Context: {context}\nSchema: {schema}\n").unwrap();

        let err = ExtractPlan::resolve(
            &args(&dir, &["--template", template.to_str().unwrap()]),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("'{content}'"));
    }

    #[test]
    fn test_context_and_vars() {
        let dir = workspace();
        let plan = ExtractPlan::resolve(
            &args(&dir, &["--context", "nginx on edge-1", "--var", "log_type=web server"]),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(plan.vars["context"], "nginx on edge-1");
        assert_eq!(plan.vars["log_type"], "web server");
    }

    #[test]
    fn test_backend_overrides() {
        let dir = workspace();
        let plan = ExtractPlan::resolve(
            &args(&dir, &["--model", "llama3", "--endpoint", "http://gpu:11434"]),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(plan.backend.model, "llama3");
        assert_eq!(plan.backend.endpoint, "http://gpu:11434");
    }

    #[test]
    fn test_invalid_toml_file() {
        let dir = workspace();
        let settings = dir.path().join("extract.toml");
        fs::write(&settings, "chunk_size = \"many\"\n").unwrap();

        let err = ExtractPlan::resolve(
            &args(&dir, &["--config", settings.to_str().unwrap()]),
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Configuration(ConfigurationError::Invalid(_))));
    }
}
