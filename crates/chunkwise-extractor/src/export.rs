//! Writing reports to JSON and CSV artifacts
//!
//! A failed write never touches the in-memory report; callers can still
//! render it after an export error.

use crate::error::ExtractorError;
use chunkwise_domain::{AggregateReport, ChunkOutcome};
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Write the report as a pretty-printed JSON array
pub fn write_json(report: &AggregateReport, path: &Path) -> Result<(), ExtractorError> {
    let json = report.to_json_pretty()?;
    std::fs::write(path, json).map_err(|e| ExtractorError::io(path, e))?;
    info!("Wrote JSON report to {}", path.display());
    Ok(())
}

/// Write the report as CSV with one row per chunk
pub fn write_csv<S: AsRef<str>>(
    report: &AggregateReport,
    columns: &[S],
    path: &Path,
) -> Result<(), ExtractorError> {
    std::fs::write(path, to_csv(report, columns)).map_err(|e| ExtractorError::io(path, e))?;
    info!("Wrote CSV report to {}", path.display());
    Ok(())
}

/// Render the report as CSV
///
/// Header: `chunk,status,<columns...>,error`. Column values are top-level
/// fields of each result: strings as-is, other values as compact JSON,
/// missing fields empty. Failed rows leave the columns empty and fill
/// `error`.
///
/// # Examples
///
/// ```
/// use chunkwise_domain::AggregateReport;
/// use chunkwise_extractor::export::to_csv;
/// use serde_json::json;
///
/// let report = AggregateReport::aggregate(vec![
///     (0, Ok(json!({"summary": "a, b", "count": 2}))),
/// ]);
/// assert_eq!(
///     to_csv(&report, &["summary", "count"]),
///     "chunk,status,summary,count,error\n0,ok,\"a, b\",2,\n"
/// );
/// ```
pub fn to_csv<S: AsRef<str>>(report: &AggregateReport, columns: &[S]) -> String {
    let mut out = String::new();

    let mut header = vec![Cow::Borrowed("chunk"), Cow::Borrowed("status")];
    header.extend(columns.iter().map(|c| escape_field(c.as_ref())));
    header.push(Cow::Borrowed("error"));
    push_row(&mut out, header);

    for outcome in report.outcomes() {
        let mut row: Vec<Cow<'_, str>> = vec![Cow::Owned(outcome.chunk().to_string())];
        match outcome {
            ChunkOutcome::Ok { result, .. } => {
                row.push(Cow::Borrowed("ok"));
                row.extend(columns.iter().map(|c| escape_field(&cell(result, c.as_ref())).into_owned().into()));
                row.push(Cow::Borrowed(""));
            }
            ChunkOutcome::Failed { error, .. } => {
                row.push(Cow::Borrowed("failed"));
                row.extend(columns.iter().map(|_| Cow::Borrowed("")));
                row.push(escape_field(&error.to_string()).into_owned().into());
            }
        }
        push_row(&mut out, row);
    }

    out
}

fn push_row(out: &mut String, fields: Vec<Cow<'_, str>>) {
    out.push_str(&fields.join(","));
    out.push('\n');
}

fn cell(result: &Value, column: &str) -> String {
    match result.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Quote a field when it holds a delimiter, quote or line break
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
