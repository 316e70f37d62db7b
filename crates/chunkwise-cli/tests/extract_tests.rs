//! Integration tests for the extract command
//!
//! These tests resolve real command lines against files in a temporary
//! directory and run the extraction with a mock backend.

use chunkwise_cli::commands::extract::{report, run_extraction, ExtractPlan};
use chunkwise_cli::config::OutputFormat;
use chunkwise_cli::{Cli, Command, Config, Formatter};
use chunkwise_domain::AggregateReport;
use chunkwise_extractor::{Extractor, SchemaGenerator};
use chunkwise_llm::MockProvider;
use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const QUIET_CHUNK: &str = r#"{
    "summary": "Routine traffic",
    "observations": ["Mostly 200 responses"],
    "planning": ["Group by path"],
    "events": [],
    "traffic_patterns": [],
    "requires_immediate_attention": false
}"#;

fn write_log(dir: &Path, lines: usize) -> String {
    let path = dir.join("access.log");
    let entries: Vec<String> = (0..lines)
        .map(|i| format!("192.168.1.{} - - \"GET /item/{} HTTP/1.1\" 200 512", i % 11, i))
        .collect();
    fs::write(&path, entries.join("\n")).unwrap();
    path.to_string_lossy().into_owned()
}

fn plan(argv: &[&str]) -> ExtractPlan {
    let mut full = vec!["chunkwise", "extract"];
    full.extend_from_slice(argv);
    match Cli::parse_from(full).command {
        Command::Extract(args) => ExtractPlan::resolve(&args, &Config::default()).unwrap(),
        _ => panic!("Expected Extract command"),
    }
}

#[test]
fn test_failed_chunk_is_reported_and_exported() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), 45);
    let json_path = dir.path().join("report.json");
    let csv_path = dir.path().join("report.csv");

    let plan = plan(&[
        "--input",
        &input,
        "--chunk-size",
        "20",
        "--json",
        json_path.to_str().unwrap(),
        "--csv",
        csv_path.to_str().unwrap(),
    ]);

    let mut llm = MockProvider::new(QUIET_CHUNK);
    llm.fail_on_call(2);
    let extractor = Extractor::with_template(
        SchemaGenerator::new(llm.clone()),
        plan.config.clone(),
        plan.template.clone(),
    )
    .unwrap();

    let run = run_extraction(&extractor, &plan).unwrap();
    assert_eq!(run.metadata.chunk_count, 3);
    assert_eq!(run.report.summary().to_string(), "2 analyzed, 1 failed");
    assert_eq!(llm.call_count(), 3);

    let formatter = Formatter::new(OutputFormat::Quiet, false);
    report(&run, &plan, &formatter).unwrap();

    let written = AggregateReport::from_json(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(written, run.report);

    let csv = fs::read_to_string(&csv_path).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(
        rows[0],
        "chunk,status,summary,highest_severity,requires_immediate_attention,error"
    );
    assert_eq!(rows[1], "0,ok,Routine traffic,,false,");
    assert!(rows[2].starts_with("1,failed,,,,"));
    assert!(rows[2].contains("backend_unavailable"));
    assert_eq!(rows[3], "2,ok,Routine traffic,,false,");
}

#[test]
fn test_tagged_units_and_vars_reach_the_backend() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), 3);
    let plan = plan(&[
        "--input",
        &input,
        "--tag-units",
        "--context",
        "Web server logs from edge-1",
    ]);

    let llm = MockProvider::new(QUIET_CHUNK);
    let extractor = Extractor::with_template(
        SchemaGenerator::new(llm.clone()),
        plan.config.clone(),
        plan.template.clone(),
    )
    .unwrap();

    let run = run_extraction(&extractor, &plan).unwrap();
    assert_eq!(run.report.summary().analyzed, 1);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Web server logs from edge-1"));
    assert!(prompts[0].contains("LOGID-AA 192.168.1.0"));
    assert!(prompts[0].contains("LOGID-AC 192.168.1.2"));
    assert!(prompts[0].contains("\"title\": \"LogAnalysis\""));
}

#[test]
fn test_empty_input_completes_with_empty_report() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("empty.log");
    fs::write(&input, "").unwrap();
    let plan = plan(&["--input", input.to_str().unwrap()]);

    let llm = MockProvider::new(QUIET_CHUNK);
    let extractor = Extractor::with_template(
        SchemaGenerator::new(llm.clone()),
        plan.config.clone(),
        plan.template.clone(),
    )
    .unwrap();

    let run = run_extraction(&extractor, &plan).unwrap();
    assert!(run.report.is_empty());
    assert_eq!(run.metadata.chunk_count, 0);
    assert_eq!(llm.call_count(), 0);
}

#[test]
fn test_unwritable_output_exits_1_after_report() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), 5);
    let missing_dir = dir.path().join("no-such-dir").join("report.json");
    let plan = plan(&["--input", &input, "--json", missing_dir.to_str().unwrap()]);

    let extractor = Extractor::with_template(
        SchemaGenerator::new(MockProvider::new(QUIET_CHUNK)),
        plan.config.clone(),
        plan.template.clone(),
    )
    .unwrap();
    let run = run_extraction(&extractor, &plan).unwrap();

    let formatter = Formatter::new(OutputFormat::Quiet, false);
    let err = report(&run, &plan, &formatter).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert_eq!(run.report.summary().analyzed, 1);
}

#[test]
fn test_configuration_errors_exit_2() {
    let dir = tempdir().unwrap();
    let input = write_log(dir.path(), 5);

    let args = match Cli::parse_from(["chunkwise", "extract", "--input", &input, "--token-budget", "0"]).command {
        Command::Extract(args) => args,
        _ => panic!("Expected Extract command"),
    };
    let err = ExtractPlan::resolve(&args, &Config::default()).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(err.to_string(), "Token budget must be at least 1, got 0");
}
