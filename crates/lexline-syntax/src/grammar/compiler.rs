use crate::grammar::definition::{GroupRef, RawInlineStyle, RawStateEntry, SyntaxDefinition};
use crate::grammar::error::SyntaxCompileError;
use lexline_core::{InlineStyle, StyleRegistry, StyleValue, parse_color};
use onig::{Regex, RegexOptions, Syntax};
use regex::Regex as RustRegex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, LazyLock};

/// Dense state id inside one [`SyntaxRule`].
pub type StateId = u32;

/// Id of the initial `default` state.
pub const DEFAULT_STATE_ID: StateId = 0;

/// Name of the initial state.
pub const DEFAULT_STATE_NAME: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What a matched token does to the state stack.
pub enum Transition {
    /// Keep the current state.
    Stay,
    /// Replace the top of the stack.
    Goto(StateId),
    /// Push a state.
    Push(StateId),
    /// Pop the top state (no-op on the root frame).
    Pop,
}

impl Transition {
    fn remap(self, map: impl Fn(StateId) -> StateId) -> Self {
        match self {
            Self::Goto(id) => Self::Goto(map(id)),
            Self::Push(id) => Self::Push(map(id)),
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
/// A compiled token rule.
pub struct TokenRule {
    /// Pattern source after variable substitution.
    pub pattern: String,
    /// Number of capture groups in `pattern`.
    pub group_count: usize,
    /// Index of the group wrapping this token inside its state's merged regex.
    pub group_offset: usize,
    /// Styles keyed by capture group (0 = whole match).
    pub styles: BTreeMap<usize, StyleValue>,
    /// Sub-states keyed by capture group; the group's text is re-lexed with that state.
    pub sub_states: BTreeMap<usize, StateId>,
    /// Stack effect of a match.
    pub transition: Transition,
}

impl TokenRule {
    /// `true` when the whole match maps to a single style with no group overrides.
    pub fn is_plain(&self) -> bool {
        self.sub_states.is_empty() && self.styles.keys().all(|&group| group == 0)
    }
}

#[derive(Debug, Clone)]
/// A compiled lexer state: its token rules merged into one ordered alternation.
pub struct CompiledState {
    /// State name (`lang::name` for states copied in by `importSyntax`).
    pub name: String,
    /// Token rules in priority order.
    pub tokens: Vec<TokenRule>,
    /// State replacing this one when a line ends inside it.
    pub line_end_state: Option<StateId>,
    /// Source of the merged regex (`(p0)|(p1)|...`).
    pub merged_pattern: String,
    regex: Option<Arc<Regex>>,
}

impl CompiledState {
    fn new(name: String) -> Self {
        Self {
            name,
            tokens: Vec::new(),
            line_end_state: None,
            merged_pattern: String::new(),
            regex: None,
        }
    }

    /// The merged regex, or `None` for a state without token rules.
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_deref()
    }
}

/// Inputs a grammar compilation borrows from the engine.
pub struct CompileContext<'a> {
    /// Registry receiving style names (id mode).
    pub styles: &'a mut StyleRegistry,
    /// Defined macros for `#ifdef`/`#ifndef`.
    pub macros: &'a HashSet<String>,
    /// Previously compiled grammars, for `importSyntax`.
    pub rules: &'a [Arc<SyntaxRule>],
    /// Resolve styles to inline appearances instead of registry ids.
    pub inline_style: bool,
}

#[derive(Debug)]
/// An immutable compiled grammar.
pub struct SyntaxRule {
    name: String,
    file_extensions: Vec<String>,
    states: Vec<CompiledState>,
    state_ids: HashMap<String, StateId>,
    inline_styles: HashMap<String, InlineStyle>,
}

impl SyntaxRule {
    /// Compile a JSON grammar.
    pub fn compile_json(json: &str, ctx: &mut CompileContext<'_>) -> Result<Self, SyntaxCompileError> {
        Self::compile(SyntaxDefinition::from_json(json)?, ctx)
    }

    /// Compile a parsed [`SyntaxDefinition`].
    pub fn compile(
        definition: SyntaxDefinition,
        ctx: &mut CompileContext<'_>,
    ) -> Result<Self, SyntaxCompileError> {
        let name = definition
            .name
            .ok_or(SyntaxCompileError::MissingProperty("name"))?;
        let file_extensions = match (definition.file_extensions, definition.file_extension) {
            (Some(list), _) => list,
            (None, Some(one)) => vec![one],
            (None, None) => {
                return Err(SyntaxCompileError::MissingProperty(
                    "fileExtensions or fileExtension",
                ));
            }
        };

        let inline_styles = if ctx.inline_style {
            let styles = definition
                .styles
                .ok_or(SyntaxCompileError::MissingProperty("styles"))?;
            parse_inline_styles(&name, styles)
        } else {
            HashMap::new()
        };

        let variables = realize_variables(&definition.variables)?;
        let raw_states = definition
            .states
            .ok_or(SyntaxCompileError::MissingProperty("states"))?;
        if !raw_states.contains_key(DEFAULT_STATE_NAME) {
            return Err(SyntaxCompileError::MissingProperty("states.default"));
        }

        // `default` first, the rest in name order.
        let mut state_ids = HashMap::new();
        let ordered: Vec<(&String, &Vec<RawStateEntry>)> = raw_states
            .get_key_value(DEFAULT_STATE_NAME)
            .into_iter()
            .chain(raw_states.iter().filter(|(k, _)| *k != DEFAULT_STATE_NAME))
            .collect();
        for (id, (state_name, _)) in ordered.iter().enumerate() {
            state_ids.insert((*state_name).clone(), id as StateId);
        }

        // Styles are registered into a copy and committed only once the whole grammar compiled.
        let mut styles = ctx.styles.clone();
        let mut scratch = CompileContext {
            styles: &mut styles,
            macros: ctx.macros,
            rules: ctx.rules,
            inline_style: ctx.inline_style,
        };
        let rules = ctx.rules;
        let mut builder = RuleBuilder {
            ctx: &mut scratch,
            variables: &variables,
            state_ids: &state_ids,
            inline_styles: &inline_styles,
        };

        let mut states = Vec::with_capacity(ordered.len());
        let mut imports = Vec::new();
        for (id, (state_name, entries)) in ordered.iter().enumerate() {
            let mut state = CompiledState::new((*state_name).clone());
            for (index, entry) in entries.iter().enumerate() {
                if !builder.guard_passes(entry) {
                    continue;
                }
                let path = format!("states.{state_name}[{index}]");
                if let Some(target) = &entry.on_line_end_state {
                    state.line_end_state = Some(builder.state_id(target)?);
                } else if let Some(syntax) = &entry.import_syntax {
                    imports.push((id as StateId, syntax.clone()));
                } else {
                    state.tokens.push(builder.token(entry, &path)?);
                }
            }
            states.push(state);
        }

        for (target, syntax) in imports {
            let source = rules
                .iter()
                .find(|rule| rule.name == syntax)
                .cloned()
                .ok_or_else(|| SyntaxCompileError::UnknownSyntax(syntax.clone()))?;
            import_rule(&mut states, &mut state_ids, target, &source);
        }

        for state in &mut states {
            build_merged_regex(state)?;
        }
        *ctx.styles = styles;

        tracing::debug!(
            syntax = %name,
            states = states.len(),
            tokens = states.iter().map(|s| s.tokens.len()).sum::<usize>(),
            "compiled syntax rule"
        );

        Ok(Self {
            name,
            file_extensions,
            states,
            state_ids,
            inline_styles,
        })
    }

    /// Grammar name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File extensions as written in the grammar.
    pub fn file_extensions(&self) -> &[String] {
        &self.file_extensions
    }

    /// Check an extension against the grammar's list; a leading `.` is optional on both sides.
    pub fn matches_extension(&self, extension: &str) -> bool {
        let wanted = extension.strip_prefix('.').unwrap_or(extension);
        self.file_extensions
            .iter()
            .any(|ext| ext.strip_prefix('.').unwrap_or(ext) == wanted)
    }

    /// Number of states (imported states included).
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Compiled state by id.
    pub fn state(&self, id: StateId) -> Option<&CompiledState> {
        self.states.get(id as usize)
    }

    /// Look up a state id by name.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.state_ids.get(name).copied()
    }

    /// Inline appearance declared in the grammar's `styles` table.
    pub fn inline_style(&self, name: &str) -> Option<&InlineStyle> {
        self.inline_styles.get(name)
    }
}

struct RuleBuilder<'c, 'a> {
    ctx: &'c mut CompileContext<'a>,
    variables: &'c HashMap<String, String>,
    state_ids: &'c HashMap<String, StateId>,
    inline_styles: &'c HashMap<String, InlineStyle>,
}

impl RuleBuilder<'_, '_> {
    fn guard_passes(&self, entry: &RawStateEntry) -> bool {
        let defined = |name: &String| self.ctx.macros.contains(name);
        entry.ifdef.as_ref().is_none_or(defined) && !entry.ifndef.as_ref().is_some_and(defined)
    }

    fn state_id(&self, name: &str) -> Result<StateId, SyntaxCompileError> {
        self.state_ids
            .get(name)
            .copied()
            .ok_or_else(|| SyntaxCompileError::UnknownState(name.to_string()))
    }

    fn style(&mut self, name: &str) -> StyleValue {
        if !self.ctx.inline_style {
            return StyleValue::Id(self.ctx.styles.get_or_create_style_id(name));
        }
        match self.inline_styles.get(name) {
            Some(style) => StyleValue::Inline(*style),
            None => {
                tracing::warn!(style = name, "style not declared in the grammar's styles table");
                StyleValue::Inline(InlineStyle::default())
            }
        }
    }

    fn token(&mut self, entry: &RawStateEntry, path: &str) -> Result<TokenRule, SyntaxCompileError> {
        let raw = entry
            .pattern
            .as_deref()
            .ok_or_else(|| SyntaxCompileError::invalid(path, "entry has no pattern"))?;
        let pattern = substitute_variables(raw, self.variables)?;
        let regex = compile_regex(&pattern)?;
        let group_count = regex.captures_len();
        let mut named = HashMap::new();
        regex.foreach_name(|name, groups| {
            if let Some(&first) = groups.first() {
                named.insert(name.to_string(), first as usize);
            }
            true
        });

        let mut styles = BTreeMap::new();
        if let Some(style) = &entry.style {
            styles.insert(0, self.style(style));
        }
        for (group, style) in pairs(entry.styles.as_deref(), group_count, &named, path, "styles")? {
            styles.insert(group, self.style(style));
        }

        let mut sub_states = BTreeMap::new();
        if let Some(state) = &entry.sub_state {
            sub_states.insert(0, self.state_id(state)?);
        }
        for (group, state) in pairs(
            entry.sub_states.as_deref(),
            group_count,
            &named,
            path,
            "subStates",
        )? {
            sub_states.insert(group, self.state_id(state)?);
        }

        if styles.is_empty() && sub_states.is_empty() {
            return Err(SyntaxCompileError::invalid(
                path,
                "token needs style/styles or subState/subStates",
            ));
        }

        let transition = match (&entry.state, &entry.push, entry.pop.unwrap_or(false)) {
            (None, None, false) => Transition::Stay,
            (Some(goto), None, false) => Transition::Goto(self.state_id(goto)?),
            (None, Some(push), false) => Transition::Push(self.state_id(push)?),
            (None, None, true) => Transition::Pop,
            _ => {
                return Err(SyntaxCompileError::invalid(
                    path,
                    "state, push and pop are mutually exclusive",
                ));
            }
        };

        Ok(TokenRule {
            pattern,
            group_count,
            group_offset: 0,
            styles,
            sub_states,
            transition,
        })
    }
}

/// Resolve a `[group, value, group, value, ...]` list.
fn pairs<'e>(
    list: Option<&'e [GroupRef]>,
    group_count: usize,
    named: &HashMap<String, usize>,
    path: &str,
    key: &str,
) -> Result<Vec<(usize, &'e str)>, SyntaxCompileError> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let property = || format!("{path}.{key}");
    if list.len() % 2 != 0 {
        return Err(SyntaxCompileError::invalid(
            property(),
            "expected [group, value, ...] pairs",
        ));
    }

    list.chunks_exact(2)
        .map(|pair| {
            let group = match &pair[0] {
                GroupRef::Index(index) if *index <= group_count => *index,
                GroupRef::Index(index) => {
                    return Err(SyntaxCompileError::invalid(
                        property(),
                        format!("group {index} exceeds the pattern's {group_count} groups"),
                    ));
                }
                GroupRef::Name(name) => *named.get(name).ok_or_else(|| {
                    SyntaxCompileError::invalid(property(), format!("no group named '{name}'"))
                })?,
            };
            match &pair[1] {
                GroupRef::Name(value) => Ok((group, value.as_str())),
                GroupRef::Index(_) => Err(SyntaxCompileError::invalid(
                    property(),
                    "pair value must be a name",
                )),
            }
        })
        .collect()
}

fn parse_inline_styles(syntax: &str, styles: Vec<RawInlineStyle>) -> HashMap<String, InlineStyle> {
    styles
        .into_iter()
        .map(|raw| {
            let mut style = InlineStyle {
                foreground: raw.foreground.as_deref().map(parse_color).unwrap_or(0),
                background: raw.background.as_deref().map(parse_color).unwrap_or(0),
                ..InlineStyle::default()
            };
            for tag in &raw.tags {
                if !style.apply_tag(tag) {
                    tracing::warn!(syntax, style = %raw.name, tag = %tag, "ignoring unknown style tag");
                }
            }
            (raw.name, style)
        })
        .collect()
}

/// Copy `source` into `states`: its `default` tokens are appended to `target`, its other
/// states become new states, and transitions back to its `default` resolve to `target`.
fn import_rule(
    states: &mut Vec<CompiledState>,
    state_ids: &mut HashMap<String, StateId>,
    target: StateId,
    source: &SyntaxRule,
) {
    let offset = states.len() as StateId;
    let remap = |id: StateId| {
        if id == DEFAULT_STATE_ID {
            target
        } else {
            offset + id - 1
        }
    };
    let remap_token = |token: &TokenRule| TokenRule {
        transition: token.transition.remap(remap),
        sub_states: token
            .sub_states
            .iter()
            .map(|(&group, &state)| (group, remap(state)))
            .collect(),
        ..token.clone()
    };

    let Some((default, others)) = source.states.split_first() else {
        return;
    };
    states[target as usize]
        .tokens
        .extend(default.tokens.iter().map(remap_token));

    for state in others {
        let name = format!("{}::{}", source.name, state.name);
        let mut copy = CompiledState::new(name.clone());
        copy.tokens = state.tokens.iter().map(remap_token).collect();
        copy.line_end_state = state.line_end_state.map(remap);
        state_ids.entry(name).or_insert(states.len() as StateId);
        states.push(copy);
    }

    tracing::debug!(
        syntax = %source.name,
        target,
        imported_states = others.len(),
        "imported syntax"
    );
}

fn compile_regex(pattern: &str) -> Result<Regex, SyntaxCompileError> {
    Regex::with_options(
        pattern,
        RegexOptions::REGEX_OPTION_CAPTURE_GROUP,
        Syntax::default(),
    )
    .map_err(|e| SyntaxCompileError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn build_merged_regex(state: &mut CompiledState) -> Result<(), SyntaxCompileError> {
    if state.tokens.is_empty() {
        return Ok(());
    }

    let mut merged = String::new();
    let mut next_group = 1usize;
    for (i, token) in state.tokens.iter_mut().enumerate() {
        token.group_offset = next_group;
        next_group += 1 + token.group_count;
        if i > 0 {
            merged.push('|');
        }
        merged.push('(');
        merged.push_str(&token.pattern);
        merged.push(')');
    }

    state.regex = Some(Arc::new(compile_regex(&merged)?));
    state.merged_pattern = merged;
    Ok(())
}

fn realize_variables(
    vars: &HashMap<String, String>,
) -> Result<HashMap<String, String>, SyntaxCompileError> {
    let mut realized = HashMap::new();
    let mut visiting = HashSet::<String>::new();

    for key in vars.keys() {
        realize_one_variable(key, vars, &mut realized, &mut visiting)?;
    }

    Ok(realized)
}

fn realize_one_variable(
    key: &str,
    vars: &HashMap<String, String>,
    realized: &mut HashMap<String, String>,
    visiting: &mut HashSet<String>,
) -> Result<String, SyntaxCompileError> {
    if let Some(val) = realized.get(key) {
        return Ok(val.clone());
    }
    if !visiting.insert(key.to_string()) {
        return Err(SyntaxCompileError::CircularVariable(key.to_string()));
    }

    let raw = vars
        .get(key)
        .ok_or_else(|| SyntaxCompileError::UnknownVariable(key.to_string()))?;

    let mut out = String::new();
    let mut last = 0usize;
    for (m_start, m_end, name) in variable_refs(raw) {
        out.push_str(&raw[last..m_start]);
        out.push_str(&realize_one_variable(name, vars, realized, visiting)?);
        last = m_end;
    }
    out.push_str(&raw[last..]);

    visiting.remove(key);
    realized.insert(key.to_string(), out.clone());
    Ok(out)
}

fn substitute_variables(
    text: &str,
    vars: &HashMap<String, String>,
) -> Result<String, SyntaxCompileError> {
    let mut out = String::new();
    let mut last = 0usize;
    for (m_start, m_end, name) in variable_refs(text) {
        out.push_str(&text[last..m_start]);
        let value = vars
            .get(name)
            .ok_or_else(|| SyntaxCompileError::UnknownVariable(name.to_string()))?;
        out.push_str(value);
        last = m_end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

static VARIABLE_REF: LazyLock<RustRegex> =
    LazyLock::new(|| RustRegex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("valid variable regex"));

/// `${name}` references as `(start, end, name)`; anything else stays literal.
fn variable_refs(text: &str) -> Vec<(usize, usize, &str)> {
    VARIABLE_REF
        .captures_iter(text)
        .filter_map(|cap| {
            let m = cap.get(0)?;
            let name = cap.get(1)?.as_str();
            Some((m.start(), m.end(), name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(json: &str) -> Result<SyntaxRule, SyntaxCompileError> {
        let mut styles = StyleRegistry::new();
        let macros = HashSet::new();
        let mut ctx = CompileContext {
            styles: &mut styles,
            macros: &macros,
            rules: &[],
            inline_style: false,
        };
        SyntaxRule::compile_json(json, &mut ctx)
    }

    #[test]
    fn test_nested_variables() {
        let vars = HashMap::from([
            ("digit".to_string(), "[0-9]".to_string()),
            ("number".to_string(), "${digit}+".to_string()),
        ]);
        let realized = realize_variables(&vars).unwrap();
        assert_eq!(realized["number"], "[0-9]+");
        assert_eq!(
            substitute_variables("x${number}y", &realized).unwrap(),
            "x[0-9]+y"
        );
    }

    #[test]
    fn test_circular_variables() {
        let vars = HashMap::from([
            ("a".to_string(), "${b}".to_string()),
            ("b".to_string(), "${a}".to_string()),
        ]);
        assert!(matches!(
            realize_variables(&vars),
            Err(SyntaxCompileError::CircularVariable(_))
        ));
    }

    #[test]
    fn test_group_offsets_in_merged_regex() {
        let rule = compile(
            r#"{
                "name": "t", "fileExtension": "t",
                "states": { "default": [
                    { "pattern": "(a)(b)", "styles": [1, "x", 2, "y"] },
                    { "pattern": "c", "style": "z" },
                    { "pattern": "(?<n>d)", "styles": ["n", "w"] }
                ] }
            }"#,
        )
        .unwrap();

        let state = rule.state(DEFAULT_STATE_ID).unwrap();
        let offsets: Vec<usize> = state.tokens.iter().map(|t| t.group_offset).collect();
        assert_eq!(offsets, vec![1, 4, 5]);
        assert_eq!(state.merged_pattern, "((a)(b))|(c)|((?<n>d))");
        assert_eq!(state.tokens[2].styles.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_default_state_gets_id_zero() {
        let rule = compile(
            r#"{
                "name": "t", "fileExtensions": [".t"],
                "states": {
                    "alpha": [ { "pattern": "x", "style": "s", "state": "default" } ],
                    "default": [ { "pattern": "y", "style": "s", "push": "alpha" } ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(rule.state_id("default"), Some(0));
        assert_eq!(rule.state_id("alpha"), Some(1));
        assert_eq!(
            rule.state(0).unwrap().tokens[0].transition,
            Transition::Push(1)
        );
        assert!(rule.matches_extension("t"));
        assert!(rule.matches_extension(".t"));
    }

    #[test]
    fn test_conflicting_transitions_are_rejected() {
        let err = compile(
            r#"{
                "name": "t", "fileExtension": "t",
                "states": { "default": [ { "pattern": "x", "style": "s", "state": "default", "pop": true } ] }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxCompileError::InvalidProperty { .. }));
    }

    #[test]
    fn test_failed_compile_registers_no_styles() {
        let mut styles = StyleRegistry::new();
        let macros = HashSet::new();
        let registered = styles.len();
        let mut ctx = CompileContext {
            styles: &mut styles,
            macros: &macros,
            rules: &[],
            inline_style: false,
        };
        let err = SyntaxRule::compile_json(
            r#"{
                "name": "t", "fileExtension": "t",
                "states": { "default": [
                    { "pattern": "a", "style": "orphan" },
                    { "pattern": "(b", "style": "broken" }
                ] }
            }"#,
            &mut ctx,
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxCompileError::Pattern { .. }));
        assert_eq!(ctx.styles.len(), registered);

        SyntaxRule::compile_json(
            r#"{
                "name": "t", "fileExtension": "t",
                "states": { "default": [ { "pattern": "a", "style": "kept" } ] }
            }"#,
            &mut ctx,
        )
        .unwrap();
        assert_eq!(styles.style_id("orphan"), None);
        assert!(styles.style_id("kept").is_some());
    }
}
