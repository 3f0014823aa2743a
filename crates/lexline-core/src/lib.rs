#![warn(missing_docs)]
//! lexline core - documents, styles and span buffers for the lexline highlighting engine
//!
//! # Overview
//!
//! `lexline-core` holds everything the highlighter produces or consumes that does not depend on
//! grammars:
//!
//! - **Document model**: line storage with an incrementally patched line table, mapping between
//!   `(line, column)` and absolute character indices
//! - **Styles**: the style name registry and inline appearances
//! - **Spans**: typed per-line highlighting results
//! - **Codec**: the flat `i32` span buffer handed to hosts
//!
//! All coordinates count Unicode scalar values.
//!
//! # Quick Start
//!
//! ```rust
//! use lexline_core::{Document, TextRange};
//!
//! let mut doc = Document::new("file:///demo.txt", "first\nsecond");
//! assert_eq!(doc.position_at(8).unwrap().line, 1);
//!
//! let splice = doc.patch(&TextRange::from_line_columns(0, 5, 1, 0), " and ").unwrap();
//! assert_eq!(doc.text(), "first and second");
//! assert_eq!(splice.removed, 2);
//! ```

pub mod codec;
pub mod config;
pub mod document;
mod error;
pub mod line_ending;
pub mod position;
pub mod span;
pub mod style;

pub use codec::{
    ID_STRIDE, INLINE_STRIDE, decode_document, decode_line_result, encode_document,
    encode_line_result,
};
pub use config::HighlightConfig;
pub use document::{Document, LineSplice};
pub use error::{CodecError, CoreError};
pub use line_ending::LineEnding;
pub use position::{TextPosition, TextRange};
pub use span::{DocumentHighlight, LineAnalyzeResult, LineHighlight, TokenSpan};
pub use style::{
    DEFAULT_STYLE_ID, DEFAULT_STYLE_NAME, InlineStyle, StyleId, StyleRegistry, StyleValue,
    parse_color,
};
