//! Documents and the position index.
//!
//! A [`Document`] stores its text as lines (text + terminator) together with a line table
//! holding the absolute start index of every line. Edits go through [`Document::patch`],
//! which splices only the affected lines and shifts the table entries behind them.

use crate::error::CoreError;
use crate::line_ending::{LineEnding, split_lines};
use crate::position::{TextPosition, TextRange};

#[derive(Debug, Clone, PartialEq, Eq)]
struct DocumentLine {
    text: String,
    char_count: usize,
    ending: LineEnding,
}

impl DocumentLine {
    fn new(text: &str, ending: LineEnding) -> Self {
        Self {
            text: text.to_string(),
            char_count: text.chars().count(),
            ending,
        }
    }

    /// Characters occupied by the line including its terminator.
    fn span(&self) -> usize {
        self.char_count + self.ending.width()
    }
}

/// Which line slots a patch replaced.
///
/// Lines `start_line..start_line + removed` of the old document were replaced by lines
/// `start_line..start_line + inserted` of the new one. Every other line kept its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSplice {
    /// First replaced line.
    pub start_line: usize,
    /// Number of old lines removed (always >= 1).
    pub removed: usize,
    /// Number of new lines inserted (always >= 1).
    pub inserted: usize,
    /// Signed change of the total character count.
    pub char_delta: isize,
}

impl LineSplice {
    /// Signed change of the line count.
    pub fn line_delta(&self) -> isize {
        self.inserted as isize - self.removed as isize
    }

    /// Last line (inclusive) of the replacement in the new document.
    pub fn last_inserted_line(&self) -> usize {
        self.start_line + self.inserted - 1
    }
}

/// A text document with an incrementally maintained line table.
#[derive(Debug, Clone)]
pub struct Document {
    uri: String,
    lines: Vec<DocumentLine>,
    line_starts: Vec<usize>,
}

impl Document {
    /// Create a document from its URI and initial text.
    pub fn new(uri: impl Into<String>, text: &str) -> Self {
        let mut document = Self {
            uri: uri.into(),
            lines: Vec::new(),
            line_starts: Vec::new(),
        };
        document.set_text(text);
        document
    }

    /// Replace the whole content.
    pub fn set_text(&mut self, text: &str) {
        self.lines = split_lines(text)
            .into_iter()
            .map(|(line, ending)| DocumentLine::new(line, ending))
            .collect();
        self.line_starts = Vec::with_capacity(self.lines.len());
        let mut start = 0usize;
        for line in &self.lines {
            self.line_starts.push(start);
            start += line.span();
        }
    }

    /// The document URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// File extension of the URI including the leading dot (e.g. `".java"`).
    pub fn extension(&self) -> Option<&str> {
        let name = self.uri.rsplit(['/', '\\']).next().unwrap_or(&self.uri);
        name.rfind('.').map(|dot| &name[dot..])
    }

    /// Full text, terminators included.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.total_chars());
        for line in &self.lines {
            out.push_str(&line.text);
            out.push_str(line.ending.as_str());
        }
        out
    }

    /// Number of lines (an empty document has one empty line).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total character count, terminators included.
    pub fn total_chars(&self) -> usize {
        let last = self.lines.len() - 1;
        self.line_starts[last] + self.lines[last].span()
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: usize) -> Result<&str, CoreError> {
        self.line_ref(line).map(|l| l.text.as_str())
    }

    /// Length of `line` in characters, terminator excluded.
    pub fn line_length(&self, line: usize) -> Result<usize, CoreError> {
        self.line_ref(line).map(|l| l.char_count)
    }

    /// Terminator of `line`.
    pub fn line_ending(&self, line: usize) -> Result<LineEnding, CoreError> {
        self.line_ref(line).map(|l| l.ending)
    }

    /// Absolute index of the first character of `line`.
    pub fn line_start_index(&self, line: usize) -> Result<usize, CoreError> {
        self.line_starts
            .get(line)
            .copied()
            .ok_or_else(|| CoreError::out_of_range("line", line, self.lines.len()))
    }

    /// Convert an absolute index into a position.
    ///
    /// `index == total_chars()` is valid and maps to the end of the last line. An index that
    /// falls between the `\r` and `\n` of a CRLF terminator keeps `column = index - start`.
    pub fn position_at(&self, index: usize) -> Result<TextPosition, CoreError> {
        let total = self.total_chars();
        if index > total {
            return Err(CoreError::out_of_range("index", index, total));
        }
        let line = self.line_starts.partition_point(|&start| start <= index) - 1;
        Ok(TextPosition::new(line, index - self.line_starts[line], index))
    }

    /// Build a position from line and column, validating both.
    ///
    /// On a CRLF line, `column == line_length + 1` addresses the gap between `\r` and `\n`,
    /// matching what [`Document::position_at`] returns for that index.
    pub fn position_of(&self, line: usize, column: usize) -> Result<TextPosition, CoreError> {
        let entry = self.line_ref(line)?;
        let limit = match entry.ending {
            LineEnding::Crlf => entry.char_count + 1,
            _ => entry.char_count,
        };
        if column > limit {
            return Err(CoreError::out_of_range("column", column, limit));
        }
        Ok(TextPosition::new(
            line,
            column,
            self.line_starts[line] + column,
        ))
    }

    /// Resolve a whole range by line/column, filling in absolute indices.
    pub fn resolve_range(&self, range: &TextRange) -> Result<TextRange, CoreError> {
        let start = self.position_of(range.start.line, range.start.column)?;
        let end = self.position_of(range.end.line, range.end.column)?;
        if start.index > end.index {
            return Err(CoreError::InvertedRange {
                start: start.index,
                end: end.index,
            });
        }
        Ok(TextRange::new(start, end))
    }

    /// Resolve a range given by absolute indices.
    pub fn range_of_indices(&self, start: usize, end: usize) -> Result<TextRange, CoreError> {
        if start > end {
            return Err(CoreError::InvertedRange { start, end });
        }
        Ok(TextRange::new(self.position_at(start)?, self.position_at(end)?))
    }

    /// Replace `range` (addressed by line/column) with `new_text`.
    ///
    /// Only the lines touched by the range are rebuilt; line table entries after the edit are
    /// shifted by the change in length. Nothing is modified when the range is invalid.
    pub fn patch(&mut self, range: &TextRange, new_text: &str) -> Result<LineSplice, CoreError> {
        let range = self.resolve_range(range)?;
        Ok(self.splice(range.start, range.end, new_text))
    }

    /// Replace the text between two absolute indices.
    ///
    /// Equivalent to [`Document::patch`] with the positions from [`Document::position_at`].
    pub fn patch_by_index(
        &mut self,
        start: usize,
        end: usize,
        new_text: &str,
    ) -> Result<LineSplice, CoreError> {
        let range = self.range_of_indices(start, end)?;
        Ok(self.splice(range.start, range.end, new_text))
    }

    /// Insert `text` at `position`.
    pub fn insert(&mut self, position: TextPosition, text: &str) -> Result<LineSplice, CoreError> {
        self.patch(&TextRange::new(position, position), text)
    }

    /// Delete the text covered by `range`.
    pub fn remove(&mut self, range: &TextRange) -> Result<LineSplice, CoreError> {
        self.patch(range, "")
    }

    /// Rebuild lines `start.line..=end.line` around the replacement.
    ///
    /// Both positions must be resolved; a column one past the line text is only valid inside a
    /// CRLF terminator.
    fn splice(&mut self, start: TextPosition, end: TextPosition, new_text: &str) -> LineSplice {
        let first = &self.lines[start.line];
        let last = &self.lines[end.line];
        let old_span_end = self.line_starts[end.line] + last.span();

        let mut combined = String::with_capacity(
            first.text.len() + new_text.len() + last.text.len() + last.ending.width(),
        );
        if start.column > first.char_count {
            combined.push_str(&first.text);
            combined.push('\r');
        } else {
            combined.push_str(&first.text[..byte_offset(&first.text, start.column)]);
        }
        combined.push_str(new_text);
        if end.column > last.char_count {
            combined.push('\n');
        } else {
            combined.push_str(&last.text[byte_offset(&last.text, end.column)..]);
            combined.push_str(last.ending.as_str());
        }

        let mut pieces = split_lines(&combined);
        if last.ending != LineEnding::None {
            // The combined text ends with a terminator, so the trailing piece is empty.
            pieces.pop();
        }
        let replacement: Vec<DocumentLine> = pieces
            .into_iter()
            .map(|(text, ending)| DocumentLine::new(text, ending))
            .collect();

        let mut starts = Vec::with_capacity(replacement.len());
        let mut cursor = self.line_starts[start.line];
        for line in &replacement {
            starts.push(cursor);
            cursor += line.span();
        }
        let char_delta = cursor as isize - old_span_end as isize;

        let splice = LineSplice {
            start_line: start.line,
            removed: end.line - start.line + 1,
            inserted: replacement.len(),
            char_delta,
        };

        self.lines.splice(start.line..=end.line, replacement);
        self.line_starts.splice(start.line..=end.line, starts);
        for entry in &mut self.line_starts[splice.start_line + splice.inserted..] {
            *entry = entry.wrapping_add_signed(char_delta);
        }
        tracing::trace!(
            uri = %self.uri,
            start_line = splice.start_line,
            removed = splice.removed,
            inserted = splice.inserted,
            char_delta,
            "patched document"
        );
        splice
    }

    fn line_ref(&self, line: usize) -> Result<&DocumentLine, CoreError> {
        self.lines
            .get(line)
            .ok_or_else(|| CoreError::out_of_range("line", line, self.lines.len()))
    }
}

/// Byte offset of the `column`-th char in `text` (clamped to the end).
pub fn byte_offset(text: &str, column: usize) -> usize {
    text.char_indices()
        .nth(column)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\n行1: 你好\n行2: World\n行3: 结束";

    fn assert_table_consistent(doc: &Document) {
        let fresh = Document::new(doc.uri(), &doc.text());
        assert_eq!(doc.line_count(), fresh.line_count());
        for line in 0..doc.line_count() {
            assert_eq!(doc.line_start_index(line), fresh.line_start_index(line));
            assert_eq!(doc.line_text(line), fresh.line_text(line));
        }
        assert_eq!(doc.total_chars(), doc.text().chars().count());
    }

    #[test]
    fn test_empty_document_has_one_line() {
        let doc = Document::new("empty.txt", "");
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.total_chars(), 0);
        assert_eq!(doc.position_at(0).unwrap(), TextPosition::new(0, 0, 0));
    }

    #[test]
    fn test_line_table() {
        let doc = Document::new("a.txt", "ab\r\ncde\nf");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line_start_index(0), Ok(0));
        assert_eq!(doc.line_start_index(1), Ok(4));
        assert_eq!(doc.line_start_index(2), Ok(8));
        assert_eq!(doc.line_length(1), Ok(3));
        assert_eq!(doc.total_chars(), 9);
        assert_eq!(doc.text(), "ab\r\ncde\nf");
        assert!(matches!(
            doc.line_length(3),
            Err(CoreError::OutOfRange { what: "line", .. })
        ));
    }

    #[test]
    fn test_position_round_trip() {
        let doc = Document::new("a.txt", SAMPLE);
        for index in 0..=doc.total_chars() {
            let pos = doc.position_at(index).unwrap();
            assert_eq!(pos.index, index);
            assert_eq!(doc.line_start_index(pos.line).unwrap() + pos.column, index);
        }
        assert!(doc.position_at(doc.total_chars() + 1).is_err());
    }

    #[test]
    fn test_position_of_validates_column() {
        let doc = Document::new("a.txt", "abc\nd");
        assert_eq!(doc.position_of(0, 3), Ok(TextPosition::new(0, 3, 3)));
        assert!(doc.position_of(0, 4).is_err());
        assert!(doc.position_of(2, 0).is_err());
    }

    #[test]
    fn test_patch_single_line_replace() {
        let mut doc = Document::new("test.txt", SAMPLE);
        let splice = doc
            .patch(&TextRange::from_line_columns(1, 4, 1, 6), "您不好")
            .unwrap();
        assert_eq!(splice.removed, 1);
        assert_eq!(splice.inserted, 1);
        assert_eq!(splice.char_delta, 1);
        assert_eq!(doc.line_text(1), Ok("行1: 您不好"));
        assert_table_consistent(&doc);
    }

    #[test]
    fn test_patch_across_lines() {
        let mut doc = Document::new("test.txt", SAMPLE);
        doc.patch(&TextRange::from_line_columns(2, 4, 3, 2), "宇宙\n最后一行")
            .unwrap();
        assert_eq!(doc.text(), "\n行1: 你好\n行2: 宇宙\n最后一行: 结束");
        assert_table_consistent(&doc);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut doc = Document::new("test.txt", SAMPLE);
        doc.insert(doc.position_of(2, 1).unwrap(), "=====").unwrap();
        assert_eq!(doc.line_text(2), Ok("行=====2: World"));

        let splice = doc.remove(&TextRange::from_line_columns(1, 0, 2, 9)).unwrap();
        assert_eq!(splice.removed, 2);
        assert_eq!(splice.inserted, 1);
        assert_eq!(doc.line_text(1), Ok("World"));
        assert_table_consistent(&doc);
    }

    #[test]
    fn test_patch_inserting_newlines_keeps_terminators() {
        let mut doc = Document::new("crlf.txt", "one\r\ntwo\r\nthree");
        let splice = doc
            .patch(&TextRange::from_line_columns(1, 1, 1, 2), "\r\nX\r\n")
            .unwrap();
        assert_eq!(splice.inserted, 3);
        assert_eq!(doc.text(), "one\r\nt\r\nX\r\no\r\nthree");
        assert_table_consistent(&doc);
    }

    #[test]
    fn test_patch_joining_cr_with_following_lf() {
        let mut doc = Document::new("a.txt", "a\nb");
        doc.patch(&TextRange::from_line_columns(0, 1, 0, 1), "\r").unwrap();
        assert_eq!(doc.line_ending(0), Ok(LineEnding::Crlf));
        assert_eq!(doc.line_text(0), Ok("a"));
        assert_table_consistent(&doc);
    }

    #[test]
    fn test_patch_by_index_matches_patch_by_position() {
        let mut by_index = Document::new("a.txt", SAMPLE);
        let mut by_pos = by_index.clone();
        let start = by_pos.position_of(1, 2).unwrap();
        let end = by_pos.position_of(3, 1).unwrap();

        by_index.patch_by_index(start.index, end.index, "~\n~").unwrap();
        by_pos.patch(&TextRange::new(start, end), "~\n~").unwrap();
        assert_eq!(by_index.text(), by_pos.text());
    }

    #[test]
    fn test_patch_by_index_inside_crlf() {
        let mut doc = Document::new("a.txt", "ab\r\ncd");
        assert_eq!(doc.position_at(3), Ok(TextPosition::new(0, 3, 3)));

        doc.patch_by_index(3, 4, "").unwrap();
        assert_eq!(doc.text(), "ab\rcd");
        assert_eq!(doc.line_count(), 1);

        let mut doc = Document::new("a.txt", "ab\r\ncd");
        doc.patch_by_index(3, 3, "x").unwrap();
        assert_eq!(doc.text(), "ab\rx\ncd");
        assert_eq!(doc.line_text(0), Ok("ab\rx"));
        assert_table_consistent(&doc);
    }

    #[test]
    fn test_patch_by_position_inside_crlf_matches_index() {
        let mut by_pos = Document::new("a.txt", "ab\r\ncd");
        let mut by_index = by_pos.clone();
        let start = by_pos.position_at(3).unwrap();
        let end = by_pos.position_at(4).unwrap();
        assert_eq!(by_pos.position_of(0, 3), Ok(start));
        assert!(by_pos.position_of(0, 4).is_err());

        let splice = by_pos.patch(&TextRange::new(start, end), "").unwrap();
        assert_eq!(by_index.patch_by_index(3, 4, ""), Ok(splice));
        assert_eq!(by_pos.text(), by_index.text());
        assert_eq!(by_pos.text(), "ab\rcd");
        assert_table_consistent(&by_pos);

        let doc = Document::new("a.txt", "ab\ncd");
        assert!(doc.position_of(0, 3).is_err());
    }

    #[test]
    fn test_invalid_patch_leaves_document_untouched() {
        let mut doc = Document::new("a.txt", "abc");
        assert!(doc.patch(&TextRange::from_line_columns(0, 1, 0, 9), "x").is_err());
        assert!(doc.patch_by_index(2, 1, "x").is_err());
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_extension() {
        assert_eq!(Document::new("src/Main.java", "").extension(), Some(".java"));
        assert_eq!(Document::new("Makefile", "").extension(), None);
    }
}
