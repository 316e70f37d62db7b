//! Parse raw LLM output into a schema-conforming value

use chunkwise_domain::{ExtractionResult, GenerationError, SchemaDescriptor, Violation};
use serde_json::Value;

/// Most violations quoted in one error message
const MAX_REPORTED_VIOLATIONS: usize = 5;

/// Parse an LLM response and validate it against `schema`
///
/// Any failure (no JSON, malformed JSON, a value that does not match the
/// schema) is a `schema_violation` generation error; a partially valid value
/// is never returned.
pub fn parse_structured_response(
    response: &str,
    schema: &SchemaDescriptor,
) -> Result<ExtractionResult, GenerationError> {
    // LLMs sometimes wrap JSON in markdown code blocks
    let json_str = extract_json(response)?;

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| GenerationError::schema_violation(format!("JSON parse error: {}", e)))?;

    schema
        .validate(&value)
        .map_err(|violations| GenerationError::schema_violation(describe_violations(&violations)))?;

    Ok(value)
}

/// Extract JSON from response, handling markdown code blocks
pub fn extract_json(response: &str) -> Result<&str, GenerationError> {
    let trimmed = response.trim();

    if trimmed.is_empty() {
        return Err(GenerationError::schema_violation("Empty response"));
    }

    // Check if wrapped in markdown code block
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the opening fence line (```json or ```) and the closing fence
        let body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => return Err(GenerationError::schema_violation("Empty code block")),
        };
        let body = body.trim_end();
        let body = body.strip_suffix("```").unwrap_or(body);
        return Ok(body.trim());
    }

    Ok(trimmed)
}

fn describe_violations(violations: &[Violation]) -> String {
    let mut message = violations
        .iter()
        .take(MAX_REPORTED_VIOLATIONS)
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    if violations.len() > MAX_REPORTED_VIOLATIONS {
        message.push_str(&format!(
            " (and {} more)",
            violations.len() - MAX_REPORTED_VIOLATIONS
        ));
    }
    message
}
