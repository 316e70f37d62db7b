//! Splitting input into units and grouping units into chunks

use crate::config::{ChunkStrategy, ExtractorConfig, UnitKind};
use chunkwise_domain::{Chunk, ConfigurationError, InputUnit};

/// Line that separates document pages
pub const PAGE_SEPARATOR: &str = "---";

/// Prefix of the identifiers given to tagged units
pub const TAG_PREFIX: &str = "LOGID-";

/// Groups units into chunks according to the configured strategy
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    strategy: ChunkStrategy,
    chunk_size: usize,
    token_budget: usize,
}

impl Chunker {
    /// Create a new chunker
    pub fn new(strategy: ChunkStrategy, chunk_size: usize, token_budget: usize) -> Self {
        Self {
            strategy,
            chunk_size,
            token_budget,
        }
    }

    /// Build a chunker from extractor settings
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.chunk_strategy, config.chunk_size, config.token_budget)
    }

    /// Chunk the given units
    pub fn chunk<'a>(&self, input: &'a [InputUnit]) -> Result<Vec<Chunk<'a>>, ConfigurationError> {
        match self.strategy {
            ChunkStrategy::ByCount => chunk(input, self.chunk_size),
            ChunkStrategy::ByTokenBudget => chunk_by_budget(input, self.token_budget, estimate_tokens),
        }
    }
}

/// Split `input` into contiguous chunks of at most `size` units
///
/// Every chunk except possibly the last holds exactly `size` units. Empty
/// input yields no chunks.
///
/// # Errors
///
/// `ConfigurationError::InvalidChunkSize` when `size` is 0.
///
/// # Examples
///
/// ```
/// use chunkwise_extractor::chunking::chunk;
///
/// let lines: Vec<String> = (0..45).map(|i| format!("line {}", i)).collect();
/// let sizes: Vec<usize> = chunk(&lines, 20).unwrap().iter().map(|c| c.len()).collect();
/// assert_eq!(sizes, vec![20, 20, 5]);
/// ```
pub fn chunk(input: &[InputUnit], size: usize) -> Result<Vec<Chunk<'_>>, ConfigurationError> {
    if size == 0 {
        return Err(ConfigurationError::InvalidChunkSize(size));
    }

    Ok(input
        .chunks(size)
        .enumerate()
        .map(|(index, units)| Chunk::new(index, index * size, units))
        .collect())
}

/// Pack units greedily into chunks whose estimated cost stays within `budget`
///
/// A unit that alone costs more than `budget` becomes a chunk by itself;
/// units are never split.
///
/// # Errors
///
/// `ConfigurationError::InvalidTokenBudget` when `budget` is 0.
pub fn chunk_by_budget<F>(
    input: &[InputUnit],
    budget: usize,
    cost: F,
) -> Result<Vec<Chunk<'_>>, ConfigurationError>
where
    F: Fn(&str) -> usize,
{
    if budget == 0 {
        return Err(ConfigurationError::InvalidTokenBudget(budget));
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut used = 0;

    for (position, unit) in input.iter().enumerate() {
        let unit_cost = cost(unit);
        if position > start && used + unit_cost > budget {
            chunks.push(Chunk::new(chunks.len(), start, &input[start..position]));
            start = position;
            used = 0;
        }
        used += unit_cost;
    }

    if start < input.len() {
        chunks.push(Chunk::new(chunks.len(), start, &input[start..]));
    }

    Ok(chunks)
}

/// Approximate token count of a unit (4 chars ~ 1 token, rounded up)
pub fn estimate_tokens(unit: &str) -> usize {
    unit.chars().count().div_ceil(4)
}

/// Split raw text into units of the given kind
pub fn split_units(text: &str, kind: UnitKind) -> Vec<InputUnit> {
    match kind {
        UnitKind::Line => split_lines(text),
        UnitKind::Page => split_pages(text),
    }
}

/// One unit per line, line terminators stripped
pub fn split_lines(text: &str) -> Vec<InputUnit> {
    text.lines().map(str::to_string).collect()
}

/// One unit per page; pages are separated by a line holding only `---`
///
/// Pages are trimmed and empty pages dropped.
pub fn split_pages(text: &str) -> Vec<InputUnit> {
    let mut pages = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim() == PAGE_SEPARATOR {
            push_page(&mut pages, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_page(&mut pages, &current);

    pages
}

fn push_page(pages: &mut Vec<InputUnit>, page: &str) {
    let trimmed = page.trim();
    if !trimmed.is_empty() {
        pages.push(trimmed.to_string());
    }
}

/// Identifier for the unit at `position` within its chunk
///
/// `LOGID-AA`, `LOGID-AB`, ... `LOGID-ZZ`, then wraps around.
pub fn unit_tag(position: usize) -> String {
    let first = (b'A' + ((position / 26) % 26) as u8) as char;
    let second = (b'A' + (position % 26) as u8) as char;
    format!("{}{}{}", TAG_PREFIX, first, second)
}

/// Chunk content with each unit prefixed by its tag
pub fn tagged_content(chunk: &Chunk<'_>) -> String {
    chunk
        .units
        .iter()
        .enumerate()
        .map(|(position, unit)| format!("{} {}", unit_tag(position), unit))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map a tag produced for `chunk` back to the original unit
///
/// Returns `None` for malformed tags and tags past the end of the chunk.
pub fn resolve_tag<'a>(tag: &str, chunk: &Chunk<'a>) -> Option<&'a str> {
    let letters = tag.trim().strip_prefix(TAG_PREFIX)?.as_bytes();
    if letters.len() != 2 || !letters.iter().all(u8::is_ascii_uppercase) {
        return None;
    }
    let position = (letters[0] - b'A') as usize * 26 + (letters[1] - b'A') as usize;
    chunk.units.get(position).map(String::as_str)
}
