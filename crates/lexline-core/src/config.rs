//! Engine output options.

use serde::{Deserialize, Serialize};

use crate::codec::{ID_STRIDE, INLINE_STRIDE};

/// Engine-wide output options.
///
/// Deserializes from camelCase keys so hosts can keep it next to their other JSON settings:
///
/// ```
/// let config: lexline_core::HighlightConfig =
///     serde_json::from_str(r#"{ "showIndex": true, "inlineStyle": false }"#).unwrap();
/// assert!(config.show_index);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HighlightConfig {
    /// Fill in absolute indices on produced positions (otherwise they stay 0).
    pub show_index: bool,
    /// Produce [`StyleValue::Inline`](crate::StyleValue::Inline) values from the grammar's
    /// `styles` table instead of registry ids.
    pub inline_style: bool,
}

impl HighlightConfig {
    /// Record width of the span buffer produced under this configuration.
    pub fn stride(&self) -> usize {
        if self.inline_style {
            INLINE_STRIDE
        } else {
            ID_STRIDE
        }
    }
}
