use lexline_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced while analyzing documents.
pub enum HighlightError {
    #[error(transparent)]
    /// An edit or query addressed text outside the document.
    Core(#[from] CoreError),
}
