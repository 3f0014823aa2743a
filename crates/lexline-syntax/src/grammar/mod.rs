//! JSON grammar support.
//!
//! A grammar is parsed into a [`SyntaxDefinition`] and compiled into an immutable
//! [`SyntaxRule`]: dense state ids, resolved styles and one merged Oniguruma regex per state.

mod compiler;
mod definition;
mod error;

pub use compiler::{
    CompileContext, CompiledState, DEFAULT_STATE_ID, DEFAULT_STATE_NAME, StateId, SyntaxRule,
    TokenRule, Transition,
};
pub use definition::{GroupRef, RawInlineStyle, RawStateEntry, SyntaxDefinition};
pub use error::SyntaxCompileError;
