use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while loading or compiling a JSON grammar.
pub enum SyntaxCompileError {
    #[error("JSON parse error: {0}")]
    /// The grammar is not valid JSON or does not match the grammar schema.
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    /// Reading the grammar file failed.
    Io(#[from] std::io::Error),

    #[error("grammar file is empty: {0}")]
    /// The grammar file exists but has no content.
    EmptyFile(PathBuf),

    #[error("missing required property: {0}")]
    /// A required property was absent.
    MissingProperty(&'static str),

    #[error("invalid property '{property}': {reason}")]
    /// A property was present but unusable.
    InvalidProperty {
        /// Where the property was found (e.g. `states.default[2].styles`).
        property: String,
        /// What is wrong with it.
        reason: String,
    },

    #[error("unknown variable '{0}'")]
    /// A `${name}` reference names no variable.
    UnknownVariable(String),

    #[error("circular variable reference '{0}'")]
    /// Variable expansion loop detected.
    CircularVariable(String),

    #[error("unknown state '{0}'")]
    /// A transition or sub-state names a state that does not exist.
    UnknownState(String),

    #[error("unknown syntax '{0}' in importSyntax")]
    /// An `importSyntax` entry names a grammar that has not been compiled.
    UnknownSyntax(String),

    #[error("regex compile error for pattern '{pattern}': {message}")]
    /// A token pattern failed to compile.
    Pattern {
        /// The pattern after variable substitution.
        pattern: String,
        /// The regex engine's message.
        message: String,
    },
}

impl SyntaxCompileError {
    pub(crate) fn invalid(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProperty {
            property: property.into(),
            reason: reason.into(),
        }
    }
}
