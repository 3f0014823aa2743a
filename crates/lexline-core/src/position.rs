//! Text coordinates.
//!
//! All coordinates are zero based and measured in Unicode scalar values (`char`s).

/// A position inside a document.
///
/// `index` is the absolute character offset; `line`/`column` locate the same character
/// through the document's line table. Positions produced by the engine always keep the three
/// fields consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextPosition {
    /// Zero-based line.
    pub line: usize,
    /// Zero-based column within the line.
    pub column: usize,
    /// Absolute character offset.
    pub index: usize,
}

impl TextPosition {
    /// Create a position from all three coordinates.
    pub const fn new(line: usize, column: usize, index: usize) -> Self {
        Self {
            line,
            column,
            index,
        }
    }

    /// Create a line/column position whose index is not known yet.
    ///
    /// Patch requests addressed by line and column only need these two fields.
    pub const fn at(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            index: 0,
        }
    }
}

/// A half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextRange {
    /// Inclusive start.
    pub start: TextPosition,
    /// Exclusive end.
    pub end: TextPosition,
}

impl TextRange {
    /// Create a range from two positions.
    pub const fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// Range between two line/column positions (indices unresolved).
    pub const fn from_line_columns(
        start_line: usize,
        start_column: usize,
        end_line: usize,
        end_column: usize,
    ) -> Self {
        Self {
            start: TextPosition::at(start_line, start_column),
            end: TextPosition::at(end_line, end_column),
        }
    }

    /// Returns `true` if the range is empty on the line/column axis.
    pub fn is_empty(&self) -> bool {
        self.start.line == self.end.line && self.start.column == self.end.column
    }

    /// Length in characters, based on the absolute indices.
    pub fn len(&self) -> usize {
        self.end.index.saturating_sub(self.start.index)
    }

    /// Check whether `pos` lies inside the range (line/column comparison, end exclusive).
    pub fn contains(&self, pos: &TextPosition) -> bool {
        let key = (pos.line, pos.column);
        (self.start.line, self.start.column) <= key && key < (self.end.line, self.end.column)
    }
}
