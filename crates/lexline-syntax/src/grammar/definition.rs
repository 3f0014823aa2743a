use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Raw JSON grammar, before validation.
pub struct SyntaxDefinition {
    #[serde(default)]
    /// Grammar name (required by the compiler).
    pub name: Option<String>,

    #[serde(default)]
    /// File extensions handled by the grammar.
    pub file_extensions: Option<Vec<String>>,

    #[serde(default)]
    /// Single-extension shorthand for `fileExtensions`.
    pub file_extension: Option<String>,

    #[serde(default)]
    /// Pattern fragments referenced as `${name}`.
    pub variables: HashMap<String, String>,

    #[serde(default)]
    /// Inline style table (only read in inline-style mode).
    pub styles: Option<Vec<RawInlineStyle>>,

    #[serde(default)]
    /// Lexer states keyed by name; `default` is the initial state.
    pub states: Option<BTreeMap<String, Vec<RawStateEntry>>>,
}

#[derive(Debug, Clone, Deserialize)]
/// One entry of the grammar's `styles` table.
pub struct RawInlineStyle {
    /// Style name referenced by token rules.
    pub name: String,

    #[serde(default)]
    /// `#RRGGBB` or `#AARRGGBB`.
    pub foreground: Option<String>,

    #[serde(default)]
    /// `#RRGGBB` or `#AARRGGBB`.
    pub background: Option<String>,

    #[serde(default)]
    /// Font tags: `bold`, `italic`, `strikethrough`.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
/// An element of a `styles`/`subStates` pair list: a group index or a name.
pub enum GroupRef {
    /// Numeric capture group (0 is the whole match).
    Index(usize),
    /// Named capture group, or the value half of a pair.
    Name(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One entry of a state's rule list.
///
/// An entry is a token rule (`pattern` + styling), an `onLineEndState` directive or an
/// `importSyntax` request; any kind may carry a `#ifdef`/`#ifndef` guard.
pub struct RawStateEntry {
    #[serde(default)]
    /// Token regex.
    pub pattern: Option<String>,

    #[serde(default)]
    /// Style of the whole match.
    pub style: Option<String>,

    #[serde(default)]
    /// `[group, style, group, style, ...]`.
    pub styles: Option<Vec<GroupRef>>,

    #[serde(default)]
    /// Replace the current state.
    pub state: Option<String>,

    #[serde(default)]
    /// Push a state on top of the current one.
    pub push: Option<String>,

    #[serde(default)]
    /// Return to the state below the current one.
    pub pop: Option<bool>,

    #[serde(default)]
    /// Re-lex the whole match with this state.
    pub sub_state: Option<String>,

    #[serde(default)]
    /// `[group, state, group, state, ...]`.
    pub sub_states: Option<Vec<GroupRef>>,

    #[serde(default)]
    /// State that replaces this one when a line ends inside it.
    pub on_line_end_state: Option<String>,

    #[serde(default)]
    /// Name of a compiled grammar whose rules are spliced into this state.
    pub import_syntax: Option<String>,

    #[serde(default, rename = "#ifdef")]
    /// Keep the entry only if the macro is defined.
    pub ifdef: Option<String>,

    #[serde(default, rename = "#ifndef")]
    /// Keep the entry only if the macro is not defined.
    pub ifndef: Option<String>,
}

impl SyntaxDefinition {
    /// Parse a JSON grammar.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
