//! Schema command implementation.

use crate::cli::SchemaArgs;
use crate::error::Result;
use crate::output::Formatter;
use chunkwise_domain::{ConfigurationError, SchemaDescriptor};
use std::fs;
use std::path::Path;

/// Log analysis schema used when no descriptor file is given
pub const BUILTIN_SCHEMA: &str = include_str!("../../assets/log_analysis.json");

/// Execute the schema command.
pub fn execute_schema(args: SchemaArgs, formatter: &Formatter) -> Result<()> {
    let schema = load_schema(args.schema.as_deref())?;
    println!("{}", formatter.format_schema(&schema)?);
    Ok(())
}

/// Load a schema descriptor from `path`, or the built-in one.
pub fn load_schema(path: Option<&Path>) -> Result<SchemaDescriptor> {
    let text = match path {
        Some(path) => read_required(path)?,
        None => BUILTIN_SCHEMA.to_string(),
    };
    Ok(SchemaDescriptor::from_json(&text)?)
}

/// Read a file the run cannot start without.
pub(crate) fn read_required(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConfigurationError::MissingFile(path.display().to_string()).into());
    }
    fs::read_to_string(path).map_err(|e| {
        ConfigurationError::Invalid(format!("cannot read {}: {}", path.display(), e)).into()
    })
}
