//! Per-chunk outcomes and the aggregate report of a run

use crate::error::ChunkError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The schema-conforming value produced for one chunk
pub type ExtractionResult = Value;

/// What happened to one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkOutcome {
    /// The chunk was analyzed; `result` validated against the schema
    Ok {
        /// Chunk index
        chunk: usize,
        /// Validated result
        result: ExtractionResult,
    },

    /// The chunk could not be analyzed
    Failed {
        /// Chunk index
        chunk: usize,
        /// Why it failed
        error: ChunkError,
    },
}

impl ChunkOutcome {
    /// Build an outcome from a chunk index and its result
    pub fn new(chunk: usize, result: Result<ExtractionResult, ChunkError>) -> Self {
        match result {
            Ok(result) => ChunkOutcome::Ok { chunk, result },
            Err(error) => ChunkOutcome::Failed { chunk, error },
        }
    }

    /// Index of the chunk this outcome belongs to
    pub fn chunk(&self) -> usize {
        match self {
            ChunkOutcome::Ok { chunk, .. } | ChunkOutcome::Failed { chunk, .. } => *chunk,
        }
    }

    /// Whether the chunk was analyzed
    pub fn is_ok(&self) -> bool {
        matches!(self, ChunkOutcome::Ok { .. })
    }

    /// The result, if the chunk was analyzed
    pub fn result(&self) -> Option<&ExtractionResult> {
        match self {
            ChunkOutcome::Ok { result, .. } => Some(result),
            ChunkOutcome::Failed { .. } => None,
        }
    }

    /// The error, if the chunk failed
    pub fn error(&self) -> Option<&ChunkError> {
        match self {
            ChunkOutcome::Ok { .. } => None,
            ChunkOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Ordered outcomes of one extraction run, one per chunk
///
/// Serializes as a JSON array in chunk order; failed chunks appear as
/// `{"chunk": i, "status": "failed", "error": {...}}` entries rather than
/// being dropped.
///
/// # Examples
///
/// ```
/// use chunkwise_domain::{AggregateReport, ChunkError, GenerationError};
/// use serde_json::json;
///
/// let report = AggregateReport::aggregate(vec![
///     (2, Ok(json!({"summary": "c"}))),
///     (0, Ok(json!({"summary": "a"}))),
///     (1, Err(ChunkError::from(GenerationError::timeout("120s")))),
/// ]);
///
/// let ok: Vec<usize> = report.successes().map(|(i, _)| i).collect();
/// assert_eq!(ok, vec![0, 2]);
/// assert_eq!(report.summary().to_string(), "2 analyzed, 1 failed");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateReport {
    outcomes: Vec<ChunkOutcome>,
}

impl AggregateReport {
    /// Aggregate per-chunk results, ordering them by chunk index
    ///
    /// Completion order does not matter; a failure never removes other
    /// chunks' results.
    pub fn aggregate<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (usize, Result<ExtractionResult, ChunkError>)>,
    {
        Self::from_outcomes(
            results
                .into_iter()
                .map(|(chunk, result)| ChunkOutcome::new(chunk, result))
                .collect(),
        )
    }

    /// Build a report from outcomes in any order
    pub fn from_outcomes(mut outcomes: Vec<ChunkOutcome>) -> Self {
        outcomes.sort_by_key(ChunkOutcome::chunk);
        Self { outcomes }
    }

    /// All outcomes, in chunk order
    pub fn outcomes(&self) -> &[ChunkOutcome] {
        &self.outcomes
    }

    /// Successful results with their chunk index, in chunk order
    pub fn successes(&self) -> impl Iterator<Item = (usize, &ExtractionResult)> + '_ {
        self.outcomes.iter().filter_map(|o| match o {
            ChunkOutcome::Ok { chunk, result } => Some((*chunk, result)),
            ChunkOutcome::Failed { .. } => None,
        })
    }

    /// Failures with their chunk index, in chunk order
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ChunkError)> + '_ {
        self.outcomes.iter().filter_map(|o| match o {
            ChunkOutcome::Failed { chunk, error } => Some((*chunk, error)),
            ChunkOutcome::Ok { .. } => None,
        })
    }

    /// Number of chunks covered
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True for a run over empty input
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Counts of analyzed and failed chunks
    pub fn summary(&self) -> ReportSummary {
        let analyzed = self.outcomes.iter().filter(|o| o.is_ok()).count();
        ReportSummary {
            analyzed,
            failed: self.outcomes.len() - analyzed,
        }
    }

    /// Serialize as a pretty-printed JSON array
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a report previously written by [`AggregateReport::to_json_pretty`]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let report: AggregateReport = serde_json::from_str(json)?;
        Ok(Self::from_outcomes(report.outcomes))
    }
}

/// Analyzed/failed counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Chunks with a validated result (including results with no findings)
    pub analyzed: usize,

    /// Chunks that could not be analyzed
    pub failed: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} analyzed, {} failed", self.analyzed, self.failed)
    }
}
