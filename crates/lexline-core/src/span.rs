//! Typed highlighting results.

use crate::position::{TextPosition, TextRange};
use crate::style::StyleValue;

/// A contiguous range annotated with one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSpan {
    /// Covered text.
    pub range: TextRange,
    /// Applied style.
    pub style: StyleValue,
}

impl TokenSpan {
    /// Create a span.
    pub fn new(range: TextRange, style: StyleValue) -> Self {
        Self { range, style }
    }

    /// Span on a single line, given by columns and the absolute index of the line start.
    ///
    /// Pass `None` for `line_start` to leave indices at 0.
    pub fn on_line(
        line: usize,
        start_column: usize,
        end_column: usize,
        line_start: Option<usize>,
        style: StyleValue,
    ) -> Self {
        let base = line_start.unwrap_or(0);
        let index = |column: usize| if line_start.is_some() { base + column } else { 0 };
        Self {
            range: TextRange::new(
                TextPosition::new(line, start_column, index(start_column)),
                TextPosition::new(line, end_column, index(end_column)),
            ),
            style,
        }
    }

    fn touches(&self, next: &TokenSpan) -> bool {
        self.range.end.line == next.range.start.line
            && self.range.end.column == next.range.start.column
    }
}

/// Spans of one line, ordered by start and non-overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineHighlight {
    /// The spans.
    pub spans: Vec<TokenSpan>,
}

impl LineHighlight {
    /// Append a span, merging it into the previous one when it continues it with the same style.
    pub fn push(&mut self, span: TokenSpan) {
        if let Some(last) = self.spans.last_mut()
            && last.style == span.style
            && last.touches(&span)
        {
            last.range.end = span.range.end;
            return;
        }
        self.spans.push(span);
    }

    /// Returns `true` if the line has no spans.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Highlighting of a whole document, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentHighlight {
    /// Per-line spans.
    pub lines: Vec<LineHighlight>,
}

impl DocumentHighlight {
    /// Total number of spans.
    pub fn span_count(&self) -> usize {
        self.lines.iter().map(|line| line.spans.len()).sum()
    }

    /// Iterate over all spans in document order.
    pub fn spans(&self) -> impl Iterator<Item = &TokenSpan> {
        self.lines.iter().flat_map(|line| line.spans.iter())
    }

    /// Returns `true` if there are no spans at all.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(LineHighlight::is_empty)
    }
}

/// Result of lexing a single line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineAnalyzeResult {
    /// Spans of the line.
    pub spans: Vec<TokenSpan>,
    /// Line state at the start of the next line.
    pub end_state: u32,
    /// Number of characters in the line.
    pub char_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_merges_touching_equal_styles() {
        let mut line = LineHighlight::default();
        line.push(TokenSpan::on_line(0, 0, 2, Some(10), StyleValue::Id(3)));
        line.push(TokenSpan::on_line(0, 2, 5, Some(10), StyleValue::Id(3)));
        line.push(TokenSpan::on_line(0, 6, 7, Some(10), StyleValue::Id(3)));
        line.push(TokenSpan::on_line(0, 7, 8, Some(10), StyleValue::Id(4)));

        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[0].range.end, TextPosition::new(0, 5, 15));
    }

    #[test]
    fn test_on_line_without_indices() {
        let span = TokenSpan::on_line(2, 1, 4, None, StyleValue::Id(1));
        assert_eq!(span.range.start, TextPosition::new(2, 1, 0));
        assert_eq!(span.range.end, TextPosition::new(2, 4, 0));
    }
}
