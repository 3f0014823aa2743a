//! Line lexing and the document/text analyzers built on it.

mod document;
pub mod lexer;
mod text;

pub use document::DocumentAnalyzer;
pub use lexer::{INITIAL_LINE_STATE, LineState, MAX_STACK_DEPTH};
pub use text::{LineInfo, TextAnalyzer};
