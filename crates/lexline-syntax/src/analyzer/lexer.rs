//! Resumable line lexer.
//!
//! Lexing runs on a stack of state ids. Between lines the stack is stored as a single
//! [`LineState`]: a one-frame stack is its state id, deeper stacks are interned by
//! [`StateInterner`] into ids starting at the rule's state count.

use crate::grammar::{CompiledState, DEFAULT_STATE_ID, StateId, SyntaxRule, TokenRule, Transition};
use lexline_core::StyleValue;
use onig::{Region, SearchOptions};
use std::collections::HashMap;

/// Opaque lexer context carried from one line to the next.
pub type LineState = u32;

/// State of the first line of a document.
pub const INITIAL_LINE_STATE: LineState = DEFAULT_STATE_ID;

/// Deepest state stack; a push at this depth replaces the top instead.
pub const MAX_STACK_DEPTH: usize = 32;

/// Deepest nesting of sub-state re-lexing.
const MAX_SUB_STATE_DEPTH: usize = 8;

/// A styled column range within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexedSpan {
    /// First column.
    pub start: usize,
    /// Column after the last one.
    pub end: usize,
    /// Applied style.
    pub style: StyleValue,
}

/// Maps state stacks to [`LineState`] values and back.
#[derive(Debug, Clone)]
pub struct StateInterner {
    base: u32,
    stacks: Vec<Vec<StateId>>,
    ids: HashMap<Vec<StateId>, LineState>,
}

impl StateInterner {
    /// Create an interner for `rule`.
    pub fn new(rule: &SyntaxRule) -> Self {
        Self {
            base: rule.state_count() as u32,
            stacks: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Encode a non-empty stack.
    pub fn encode(&mut self, stack: &[StateId]) -> LineState {
        if let [single] = stack {
            return *single;
        }
        if let Some(&id) = self.ids.get(stack) {
            return id;
        }
        let id = self.base + self.stacks.len() as u32;
        self.stacks.push(stack.to_vec());
        self.ids.insert(stack.to_vec(), id);
        id
    }

    /// Decode a state produced by [`StateInterner::encode`].
    ///
    /// Unknown values fall back to the initial state.
    pub fn decode(&self, state: LineState) -> Vec<StateId> {
        if state < self.base {
            return vec![state];
        }
        match self.stacks.get((state - self.base) as usize) {
            Some(stack) => stack.clone(),
            None => {
                tracing::warn!(state, "unknown line state, restarting from the initial state");
                vec![INITIAL_LINE_STATE]
            }
        }
    }

    /// Forget all interned stacks.
    pub fn clear(&mut self) {
        self.stacks.clear();
        self.ids.clear();
    }
}

/// Lex one line of text, advancing `stack` to the state for the next line.
///
/// The returned spans are ordered, non-overlapping and merged where equal styles touch.
pub fn lex_line(rule: &SyntaxRule, text: &str, stack: &mut Vec<StateId>) -> Vec<LexedSpan> {
    if stack.is_empty() {
        stack.push(INITIAL_LINE_STATE);
    }
    let mut sink = SpanSink::default();
    Lexer { rule }.lex_region(text, 0, 0, text.len(), stack, &mut sink, 0);

    if let Some(top) = stack.last_mut()
        && let Some(next) = rule.state(*top).and_then(|s| s.line_end_state)
    {
        *top = next;
    }
    sink.spans
}

#[derive(Debug, Default)]
struct SpanSink {
    spans: Vec<LexedSpan>,
}

impl SpanSink {
    fn push(&mut self, start: usize, end: usize, style: StyleValue) {
        let start = start.max(self.spans.last().map_or(0, |last| last.end));
        if start >= end {
            return;
        }
        if let Some(last) = self.spans.last_mut()
            && last.style == style
            && last.end == start
        {
            last.end = end;
            return;
        }
        self.spans.push(LexedSpan { start, end, style });
    }
}

#[derive(Debug)]
struct TokenMatch<'r> {
    token: &'r TokenRule,
    start: usize,
    end: usize,
}

struct Lexer<'r> {
    rule: &'r SyntaxRule,
}

impl<'r> Lexer<'r> {
    /// Lex `text[byte..end]`; `column` is the char column of `byte`.
    #[allow(clippy::too_many_arguments)]
    fn lex_region(
        &self,
        text: &str,
        mut byte: usize,
        mut column: usize,
        end: usize,
        stack: &mut Vec<StateId>,
        sink: &mut SpanSink,
        depth: usize,
    ) {
        let haystack = &text[..end];
        let mut region = Region::new();

        // Guard against zero-width transition cycles.
        let mut iterations = 0usize;
        let max_iterations = (end - byte + 1).saturating_mul(32).max(128);

        while byte <= end {
            iterations += 1;
            if iterations > max_iterations {
                tracing::warn!(
                    syntax = %self.rule.name(),
                    column,
                    "line lexing exceeded iteration limit (possible zero-width loop)"
                );
                break;
            }

            let top = stack.last().copied().unwrap_or(INITIAL_LINE_STATE);
            let Some(state) = self.rule.state(top) else {
                break;
            };
            let Some(found) = search_first(state, haystack, byte, &mut region) else {
                break;
            };

            let start_column = column + haystack[byte..found.start].chars().count();
            let end_column = start_column + haystack[found.start..found.end].chars().count();
            if found.end > found.start {
                self.emit_token(
                    haystack,
                    &found,
                    &region,
                    start_column,
                    end_column,
                    sink,
                    depth,
                );
            }

            let before = (stack.len(), stack.last().copied());
            apply_transition(stack, found.token.transition);
            let unchanged = before == (stack.len(), stack.last().copied());

            if found.start == found.end && unchanged {
                // Zero-width match without effect: step over one char.
                let Some(c) = haystack[found.start..].chars().next() else {
                    break;
                };
                byte = found.start + c.len_utf8();
                column = start_column + 1;
            } else {
                byte = found.end;
                column = end_column;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_token(
        &self,
        haystack: &str,
        found: &TokenMatch<'_>,
        region: &Region,
        start_column: usize,
        end_column: usize,
        sink: &mut SpanSink,
        depth: usize,
    ) {
        let token = found.token;
        if token.is_plain() {
            if let Some(style) = token.styles.get(&0) {
                sink.push(start_column, end_column, *style);
            }
            return;
        }

        // Paint per column: whole-match style, then group styles, then sub-state spans.
        let mut paint = vec![token.styles.get(&0).copied(); end_column - start_column];
        let group_columns = |group: usize| -> Option<(usize, usize, usize, usize)> {
            let (gs, ge) = region.pos(token.group_offset + group)?;
            if gs < found.start || ge > found.end || gs >= ge {
                return None;
            }
            let rel_start = haystack[found.start..gs].chars().count();
            let rel_end = rel_start + haystack[gs..ge].chars().count();
            Some((gs, ge, rel_start, rel_end))
        };

        for (&group, &style) in token.styles.iter().filter(|(g, _)| **g > 0) {
            if let Some((_, _, from, to)) = group_columns(group) {
                paint[from..to].fill(Some(style));
            }
        }

        if depth < MAX_SUB_STATE_DEPTH {
            for (&group, &sub_state) in &token.sub_states {
                let Some((gs, ge, from, _)) = group_columns(group) else {
                    continue;
                };
                let mut nested = SpanSink::default();
                let mut sub_stack = vec![sub_state];
                self.lex_region(
                    haystack,
                    gs,
                    start_column + from,
                    ge,
                    &mut sub_stack,
                    &mut nested,
                    depth + 1,
                );
                for span in nested.spans {
                    paint[span.start - start_column..span.end - start_column].fill(Some(span.style));
                }
            }
        } else if !token.sub_states.is_empty() {
            tracing::warn!(syntax = %self.rule.name(), "sub-state nesting too deep, skipping");
        }

        let mut run_start = 0;
        while run_start < paint.len() {
            let style = paint[run_start];
            let run_end = paint[run_start..]
                .iter()
                .position(|s| *s != style)
                .map_or(paint.len(), |n| run_start + n);
            if let Some(style) = style {
                sink.push(start_column + run_start, start_column + run_end, style);
            }
            run_start = run_end;
        }
    }
}

fn apply_transition(stack: &mut Vec<StateId>, transition: Transition) {
    match transition {
        Transition::Stay => {}
        Transition::Goto(state) => {
            if let Some(top) = stack.last_mut() {
                *top = state;
            }
        }
        Transition::Push(state) => {
            if stack.len() < MAX_STACK_DEPTH {
                stack.push(state);
            } else if let Some(top) = stack.last_mut() {
                *top = state;
            }
        }
        Transition::Pop => {
            if stack.len() > 1 {
                stack.pop();
            }
        }
    }
}

fn search_first<'s>(
    state: &'s CompiledState,
    haystack: &str,
    from: usize,
    region: &mut Region,
) -> Option<TokenMatch<'s>> {
    let regex = state.regex()?;
    regex.search_with_options(
        haystack,
        from,
        haystack.len(),
        SearchOptions::SEARCH_OPTION_NONE,
        Some(region),
    )?;
    let (start, end) = region.pos(0)?;
    let token = state
        .tokens
        .iter()
        .find(|token| region.pos(token.group_offset).is_some())?;
    Some(TokenMatch { token, start, end })
}
