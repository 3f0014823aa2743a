#![warn(missing_docs)]
//! lexline syntax - grammar-driven, incremental syntax highlighting
//!
//! # Overview
//!
//! Grammars are JSON documents describing named lexer states, each a prioritized list of regex
//! token rules. They compile once into an immutable [`SyntaxRule`] (Oniguruma regexes, one
//! merged alternation per state) and are shared between analyzers.
//!
//! - [`HighlightEngine`] owns compiled grammars, the style registry, macros and open documents
//! - [`DocumentAnalyzer`] keeps per-line results and re-lexes only what an edit affects
//! - [`TextAnalyzer`] highlights ad-hoc text and single lines with caller-supplied state
//!
//! # Quick Start
//!
//! ```rust
//! use lexline_core::{Document, HighlightConfig, TextRange};
//! use lexline_syntax::HighlightEngine;
//!
//! let mut engine = HighlightEngine::new(HighlightConfig::default());
//! engine
//!     .compile_syntax_from_json(
//!         r#"{
//!             "name": "tiny",
//!             "fileExtensions": [".tiny"],
//!             "states": { "default": [ { "pattern": "\\bfn\\b", "style": "keyword" } ] }
//!         }"#,
//!     )
//!     .unwrap();
//! let keyword = engine.style_id("keyword").unwrap();
//!
//! let handle = engine
//!     .load_document(Document::new("file:///main.tiny", "fn main"))
//!     .unwrap();
//! let result = engine.analyze(handle);
//! assert_eq!(result.lines[0].spans[0].style.id(), Some(keyword));
//!
//! // Typing re-lexes only the edited line.
//! let result = engine
//!     .analyze_changes(handle, &TextRange::from_line_columns(0, 7, 0, 7), "\nfn")
//!     .unwrap();
//! assert_eq!(result.lines.len(), 2);
//! ```

pub mod analyzer;
mod engine;
mod error;
pub mod grammar;

pub use analyzer::{
    DocumentAnalyzer, INITIAL_LINE_STATE, LineInfo, LineState, MAX_STACK_DEPTH, TextAnalyzer,
};
pub use engine::{DocumentHandle, HighlightEngine};
pub use error::HighlightError;
pub use grammar::{SyntaxCompileError, SyntaxRule};
