//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use chunkwise_domain::{Chunk, ChunkError, ReportSummary, SchemaDescriptor};
use chunkwise_extractor::chunking::{resolve_tag, TAG_PREFIX};
use chunkwise_extractor::ExtractionRun;
use colored::*;
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the outcome of an extraction run.
    ///
    /// `chunks` are the chunks the run was given; when present, unit tags
    /// found in results are resolved back to the original entries.
    pub fn format_run(&self, run: &ExtractionRun, chunks: &[Chunk<'_>]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_run_json(run),
            OutputFormat::Table => Ok(self.format_run_table(run, chunks)),
            OutputFormat::Quiet => Ok(self.summary_line(run.report.summary())),
        }
    }

    /// Format a run as JSON.
    fn format_run_json(&self, run: &ExtractionRun) -> Result<String> {
        let summary = run.report.summary();
        let value = json!({
            "metadata": run.metadata,
            "summary": {
                "analyzed": summary.analyzed,
                "failed": summary.failed,
            },
            "report": run.report,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Format a run as a console report.
    fn format_run_table(&self, run: &ExtractionRun, chunks: &[Chunk<'_>]) -> String {
        let meta = &run.metadata;
        let mut sections = vec![
            self.colorize("Extraction Report", "yellow"),
            format!(
                "Model: {}  Chunks: {} ({})  Started: {}  Took: {} ms",
                meta.model_name, meta.chunk_count, meta.chunk_strategy, meta.timestamp, meta.processing_time_ms
            ),
        ];

        if meta.cancelled {
            sections.push(self.warning("Run cancelled; chunks never dispatched are listed as failures"));
        }

        if run.report.is_empty() {
            sections.push(self.info("Input was empty; nothing to analyze"));
        }

        for (index, result) in run.report.successes() {
            let chunk = chunks.iter().find(|c| c.index == index);
            sections.push(self.chunk_section(index, result, chunk));
        }

        if let Some(table) = self.failures_table(run.report.failures()) {
            sections.push(self.colorize("Failed chunks", "red"));
            sections.push(table);
        }

        sections.push(self.summary_line(run.report.summary()));
        sections.join("\n\n")
    }

    /// Render one analyzed chunk.
    fn chunk_section(&self, index: usize, result: &Value, chunk: Option<&Chunk<'_>>) -> String {
        let mut parts = vec![self.colorize(&format!("── Chunk {} ──", index), "cyan")];

        let Some(fields) = result.as_object() else {
            parts.push(compact(result));
            return parts.join("\n");
        };

        let mut scalars = Builder::default();
        let mut scalar_count = 0;
        scalars.push_record(["Field", "Value"]);

        for (name, value) in fields {
            match value {
                Value::Null => {}
                Value::Array(items) if items.is_empty() => {
                    parts.push(format!("{}: none", title(name)));
                }
                Value::Array(items) if items.iter().all(Value::is_string) => {
                    parts.push(self.bullet_list(name, items));
                }
                Value::Array(items) if items.iter().all(Value::is_object) => {
                    parts.push(title(name));
                    parts.push(self.object_table(items));
                }
                _ => {
                    scalars.push_record([title(name), self.cell(name, value)]);
                    scalar_count += 1;
                }
            }
        }

        if scalar_count > 0 {
            parts.insert(1, styled(scalars));
        }

        if let Some(chunk) = chunk {
            let related = related_entries(result, chunk);
            if !related.is_empty() {
                let lines: Vec<String> = related.iter().map(|(tag, unit)| format!("  {} {}", tag, unit)).collect();
                parts.push(format!("Related entries:\n{}", lines.join("\n")));
            }
        }

        parts.join("\n")
    }

    fn bullet_list(&self, name: &str, items: &[Value]) -> String {
        let mut out = title(name);
        for item in items.iter().filter_map(Value::as_str) {
            out.push_str("\n  • ");
            out.push_str(item);
        }
        out
    }

    /// Render a list of objects as a table, one column per key.
    fn object_table(&self, items: &[Value]) -> String {
        let mut columns: Vec<&str> = Vec::new();
        for item in items.iter().filter_map(Value::as_object) {
            for key in item.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }

        let mut builder = Builder::default();
        builder.push_record(columns.iter().map(|c| title(c)));
        for item in items.iter().filter_map(Value::as_object) {
            builder.push_record(
                columns
                    .iter()
                    .map(|c| item.get(*c).map(|v| self.cell(c, v)).unwrap_or_default()),
            );
        }
        styled(builder)
    }

    /// Failures in chunk order, or `None` when every chunk was analyzed.
    fn failures_table<'r>(&self, failures: impl Iterator<Item = (usize, &'r ChunkError)>) -> Option<String> {
        let mut builder = Builder::default();
        builder.push_record(["Chunk", "Stage", "Kind", "Message"]);
        let mut count = 0;

        for (index, error) in failures {
            let (stage, kind, message) = match error {
                ChunkError::Template(e) => ("template", "-".to_string(), e.to_string()),
                ChunkError::Generation(e) => ("generation", e.kind.to_string(), e.message.clone()),
            };
            builder.push_record([index.to_string(), stage.to_string(), kind, message]);
            count += 1;
        }

        (count > 0).then(|| styled(builder))
    }

    /// One table cell; severity values are highlighted.
    fn cell(&self, name: &str, value: &Value) -> String {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Array(items) if items.iter().all(Value::is_string) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            other => compact(other),
        };
        if name.ends_with("severity") {
            self.severity(&text)
        } else {
            text
        }
    }

    /// Highlight a severity level.
    pub fn severity(&self, level: &str) -> String {
        match level.to_ascii_uppercase().as_str() {
            "CRITICAL" | "HIGH" => self.colorize(level, "red"),
            "MEDIUM" => self.colorize(level, "yellow"),
            "LOW" => self.colorize(level, "cyan"),
            "INFO" => self.colorize(level, "blue"),
            _ => level.to_string(),
        }
    }

    /// The `N analyzed, M failed` line.
    pub fn summary_line(&self, summary: ReportSummary) -> String {
        let line = summary.to_string();
        match self.format {
            OutputFormat::Quiet => line,
            _ if summary.failed > 0 => self.warning(&line),
            _ => self.success(&line),
        }
    }

    /// Format the JSON Schema derived from a descriptor.
    pub fn format_schema(&self, schema: &SchemaDescriptor) -> Result<String> {
        Ok(serde_json::to_string_pretty(&schema.to_json_schema())?)
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

fn styled(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

/// `traffic_patterns` -> `Traffic patterns`
fn title(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Unit tags mentioned anywhere in `result`, resolved against `chunk`.
fn related_entries<'a>(result: &Value, chunk: &Chunk<'a>) -> Vec<(String, &'a str)> {
    let mut tags = Vec::new();
    collect_tags(result, &mut tags);

    let mut related: Vec<(String, &'a str)> = Vec::new();
    for tag in tags {
        if related.iter().any(|(seen, _)| *seen == tag) {
            continue;
        }
        if let Some(unit) = resolve_tag(&tag, chunk) {
            related.push((tag, unit));
        }
    }
    related
}

fn collect_tags(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if s.trim().starts_with(TAG_PREFIX) => out.push(s.trim().to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_tags(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_tags(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkwise_domain::{AggregateReport, GenerationError, TemplateError};
    use chunkwise_extractor::RunMetadata;

    fn sample_run() -> ExtractionRun {
        let report = AggregateReport::aggregate(vec![
            (
                0,
                Ok(json!({
                    "summary": "Repeated admin login failures",
                    "observations": ["Burst of 401s from one address"],
                    "events": [
                        {"event_type": "brute force", "severity": "HIGH", "relevant_log_entry_ids": ["LOGID-AB"]}
                    ],
                    "highest_severity": "HIGH",
                    "requires_immediate_attention": true
                })),
            ),
            (1, Err(ChunkError::from(GenerationError::timeout("no response within 120s")))),
            (
                2,
                Err(ChunkError::from(TemplateError::UnknownPlaceholder {
                    name: "host".to_string(),
                })),
            ),
        ]);
        ExtractionRun {
            report,
            metadata: RunMetadata {
                model_name: "mock".to_string(),
                chunk_count: 3,
                chunk_strategy: "by_count".to_string(),
                timestamp: 1_700_000_000,
                processing_time_ms: 42,
                cancelled: false,
            },
        }
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_run(&sample_run(), &[]).unwrap();
        assert!(output.contains("Extraction Report"));
        assert!(output.contains("── Chunk 0 ──"));
        assert!(output.contains("Repeated admin login failures"));
        assert!(output.contains("  • Burst of 401s from one address"));
        assert!(output.contains("Event type"));
        assert!(output.contains("Failed chunks"));
        assert!(output.contains("no response within 120s"));
        assert!(output.contains("no value for placeholder '{host}'"));
        assert!(output.ends_with("⚠ 1 analyzed, 2 failed"));
    }

    #[test]
    fn test_failures_shown_in_chunk_order() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_run(&sample_run(), &[]).unwrap();
        let timeout = output.find("timeout").unwrap();
        let template = output.find("template").unwrap();
        assert!(timeout < template);
    }

    #[test]
    fn test_related_entries_resolved() {
        let lines = vec![
            "10.0.0.1 GET /".to_string(),
            "10.0.0.9 POST /admin 401".to_string(),
        ];
        let chunk = Chunk::new(0, 0, &lines);
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_run(&sample_run(), &[chunk]).unwrap();
        assert!(output.contains("Related entries:\n  LOGID-AB 10.0.0.9 POST /admin 401"));
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_run(&sample_run(), &[]).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["analyzed"], 1);
        assert_eq!(value["summary"]["failed"], 2);
        assert_eq!(value["metadata"]["model_name"], "mock");
        assert_eq!(value["report"][1]["status"], "failed");
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_run(&sample_run(), &[]).unwrap();
        assert_eq!(output, "1 analyzed, 2 failed");
    }

    #[test]
    fn test_empty_run() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let mut run = sample_run();
        run.report = AggregateReport::default();
        let output = formatter.format_run(&run, &[]).unwrap();
        assert!(output.contains("Input was empty"));
        assert!(!output.contains("Failed chunks"));
        assert!(output.ends_with("0 analyzed, 0 failed"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.severity("CRITICAL"), "CRITICAL");
    }

    #[test]
    fn test_title() {
        assert_eq!(title("traffic_patterns"), "Traffic patterns");
        assert_eq!(title(""), "");
    }
}
