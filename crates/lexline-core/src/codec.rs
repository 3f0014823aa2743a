//! Flat `i32` span buffers.
//!
//! Every span is one record:
//!
//! | ints | content |
//! |---|---|
//! | 0..6 | startLine, startColumn, startIndex, endLine, endColumn, endIndex |
//! | 6 | style id (stride 7) |
//! | 6..9 | foreground, background, tag bits (stride 9) |
//!
//! A single-line result is `[count, records.., endState, charCount]`.

use crate::error::CodecError;
use crate::position::{TextPosition, TextRange};
use crate::span::{DocumentHighlight, LineAnalyzeResult, LineHighlight, TokenSpan};
use crate::style::{InlineStyle, StyleValue};

/// Record width when spans carry style ids.
pub const ID_STRIDE: usize = 7;
/// Record width when spans carry inline styles.
pub const INLINE_STRIDE: usize = 9;

fn check_stride(stride: usize) -> Result<(), CodecError> {
    match stride {
        ID_STRIDE | INLINE_STRIDE => Ok(()),
        other => Err(CodecError::Stride(other)),
    }
}

/// Append one span record to `out`.
pub fn encode_span(span: &TokenSpan, out: &mut Vec<i32>) {
    let TextRange { start, end } = span.range;
    out.extend_from_slice(&[
        start.line as i32,
        start.column as i32,
        start.index as i32,
        end.line as i32,
        end.column as i32,
        end.index as i32,
    ]);
    match span.style {
        StyleValue::Id(id) => out.push(id as i32),
        StyleValue::Inline(style) => out.extend_from_slice(&[
            style.foreground as i32,
            style.background as i32,
            style.tag_bits(),
        ]),
    }
}

/// Encode a whole document highlight.
pub fn encode_document(highlight: &DocumentHighlight) -> Vec<i32> {
    let mut out = Vec::new();
    for span in highlight.spans() {
        encode_span(span, &mut out);
    }
    out
}

/// Encode a single-line result as `[count, records.., endState, charCount]`.
pub fn encode_line_result(result: &LineAnalyzeResult) -> Vec<i32> {
    let mut out = Vec::with_capacity(3 + result.spans.len() * INLINE_STRIDE);
    out.push(result.spans.len() as i32);
    for span in &result.spans {
        encode_span(span, &mut out);
    }
    out.push(result.end_state as i32);
    out.push(result.char_count as i32);
    out
}

fn coordinate(field: &'static str, value: i32) -> Result<usize, CodecError> {
    usize::try_from(value).map_err(|_| CodecError::Negative { field, value })
}

/// Decode one record (`record.len()` must equal the stride).
pub fn decode_span(record: &[i32]) -> Result<TokenSpan, CodecError> {
    check_stride(record.len())?;
    let start = TextPosition::new(
        coordinate("startLine", record[0])?,
        coordinate("startColumn", record[1])?,
        coordinate("startIndex", record[2])?,
    );
    let end = TextPosition::new(
        coordinate("endLine", record[3])?,
        coordinate("endColumn", record[4])?,
        coordinate("endIndex", record[5])?,
    );
    let style = if record.len() == ID_STRIDE {
        StyleValue::Id(record[6] as u32)
    } else {
        StyleValue::Inline(InlineStyle::from_packed(
            record[6] as u32,
            record[7] as u32,
            record[8],
        ))
    };
    Ok(TokenSpan::new(TextRange::new(start, end), style))
}

/// Decode a document buffer.
///
/// Consecutive records with the same start line form one [`LineHighlight`]; lines without
/// spans do not appear in the output.
pub fn decode_document(buffer: &[i32], stride: usize) -> Result<DocumentHighlight, CodecError> {
    check_stride(stride)?;
    if buffer.len() % stride != 0 {
        return Err(CodecError::Truncated {
            len: buffer.len(),
            stride,
        });
    }

    let mut lines: Vec<LineHighlight> = Vec::new();
    let mut current_line = None;
    for record in buffer.chunks_exact(stride) {
        let span = decode_span(record)?;
        if current_line != Some(span.range.start.line) {
            current_line = Some(span.range.start.line);
            lines.push(LineHighlight::default());
        }
        if let Some(line) = lines.last_mut() {
            line.spans.push(span);
        }
    }
    Ok(DocumentHighlight { lines })
}

/// Decode a `[count, records.., endState, charCount]` buffer.
pub fn decode_line_result(buffer: &[i32], stride: usize) -> Result<LineAnalyzeResult, CodecError> {
    check_stride(stride)?;
    let truncated = || CodecError::Truncated {
        len: buffer.len(),
        stride,
    };
    let (&count, rest) = buffer.split_first().ok_or_else(truncated)?;
    let count = coordinate("count", count)?;
    if rest.len() != count * stride + 2 {
        return Err(truncated());
    }

    let (records, trailer) = rest.split_at(count * stride);
    let spans = records
        .chunks_exact(stride)
        .map(decode_span)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineAnalyzeResult {
        spans,
        end_state: trailer[0] as u32,
        char_count: coordinate("charCount", trailer[1])?,
    })
}
