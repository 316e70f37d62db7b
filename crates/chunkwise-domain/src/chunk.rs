//! Input units and chunks

/// One atomic piece of source data: a log line or a document page
pub type InputUnit = String;

/// A contiguous, ordered slice of input units
///
/// A chunk borrows its units from the input read at run start. Its identity is
/// its `index` in the chunk sequence; `offset` is the position of its first
/// unit in the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Position of this chunk in the overall chunk sequence
    pub index: usize,

    /// Position of the first unit of this chunk in the input
    pub offset: usize,

    /// The units of this chunk, in input order
    pub units: &'a [InputUnit],
}

impl<'a> Chunk<'a> {
    /// Create a chunk
    pub fn new(index: usize, offset: usize, units: &'a [InputUnit]) -> Self {
        Self { index, offset, units }
    }

    /// Number of units in this chunk
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the chunk holds no units
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Input position one past the last unit of this chunk
    pub fn end(&self) -> usize {
        self.offset + self.units.len()
    }

    /// Join the units with their natural separator (newline)
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkwise_domain::Chunk;
    ///
    /// let lines = vec!["GET /".to_string(), "POST /login".to_string()];
    /// let chunk = Chunk::new(0, 0, &lines);
    /// assert_eq!(chunk.joined(), "GET /\nPOST /login");
    /// ```
    pub fn joined(&self) -> String {
        self.units.join("\n")
    }
}
