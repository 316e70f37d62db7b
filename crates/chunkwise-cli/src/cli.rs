//! CLI command definitions and argument parsing.

use chunkwise_extractor::{ExtractorConfig, UnitKind};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Chunkwise - Structured extraction over large logs and documents.
#[derive(Debug, Parser)]
#[command(name = "chunkwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (summary line only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run structured extraction over an input file
    Extract(ExtractArgs),

    /// Print the JSON Schema derived from a schema descriptor
    Schema(SchemaArgs),

    /// Manage backend profiles
    Profile(ProfileArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Input file (log lines or `---`-separated pages)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Prompt template file (built-in template if omitted)
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Schema descriptor file (built-in log analysis schema if omitted)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Model identifier (overrides the profile)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Backend endpoint (overrides the profile)
    #[arg(long, env = "CHUNKWISE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Units per chunk
    #[arg(long, conflicts_with = "token_budget")]
    pub chunk_size: Option<usize>,

    /// Estimated tokens per chunk (packs units greedily)
    #[arg(long)]
    pub token_budget: Option<usize>,

    /// What one input unit is
    #[arg(long, value_enum)]
    pub unit: Option<UnitArg>,

    /// Free-form context inserted at {context}
    #[arg(long)]
    pub context: Option<String>,

    /// Extra template variable (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Prefix each unit with a LOGID-XX tag in the prompt
    #[arg(long)]
    pub tag_units: bool,

    /// Maximum concurrent generation calls
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Per-chunk timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra attempts for a failed chunk
    #[arg(long)]
    pub retries: Option<u32>,

    /// Write the report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Write the report as CSV
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Result fields to include as CSV columns
    #[arg(long, value_delimiter = ',', requires = "csv")]
    pub columns: Vec<String>,

    /// Extractor settings file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Named extractor settings preset
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,
}

/// Arguments for the schema command.
#[derive(Debug, Parser)]
pub struct SchemaArgs {
    /// Schema descriptor file (built-in log analysis schema if omitted)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}

/// Arguments for profile management.
#[derive(Debug, Parser)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show active profile
    Show,

    /// Switch to a different profile
    Switch {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,
        /// Backend endpoint
        #[arg(short, long)]
        endpoint: String,
        /// Model identifier
        #[arg(short, long)]
        model: String,
        /// Maximum tokens generated per call
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },
}

/// Input unit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UnitArg {
    /// One log line per unit
    Line,
    /// One document page per unit
    Page,
}

/// Extractor preset argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PresetArg {
    /// Balanced settings
    Default,
    /// Larger chunks, parallel calls
    Aggressive,
    /// Smaller chunks, retries, long deadline
    Lenient,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<UnitArg> for UnitKind {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Line => UnitKind::Line,
            UnitArg::Page => UnitKind::Page,
        }
    }
}

impl From<PresetArg> for ExtractorConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => ExtractorConfig::default(),
            PresetArg::Aggressive => ExtractorConfig::aggressive(),
            PresetArg::Lenient => ExtractorConfig::lenient(),
        }
    }
}

/// Parse a `KEY=VALUE` template variable.
fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
