use crate::analyzer::lexer::{INITIAL_LINE_STATE, LineState, StateInterner, lex_line};
use crate::grammar::SyntaxRule;
use lexline_core::{
    DocumentHighlight, HighlightConfig, LineAnalyzeResult, LineHighlight, TokenSpan,
    line_ending::split_lines,
};
use std::sync::Arc;

/// Where a line sits when it is lexed on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    /// Line number reported in the produced positions.
    pub line: usize,
    /// State left by the previous line ([`INITIAL_LINE_STATE`] for the first one).
    pub start_state: LineState,
    /// Absolute index of the line's first character.
    pub start_char_offset: usize,
}

impl Default for LineInfo {
    fn default() -> Self {
        Self {
            line: 0,
            start_state: INITIAL_LINE_STATE,
            start_char_offset: 0,
        }
    }
}

/// Stateless analyzer for ad-hoc text.
///
/// Nothing is kept between calls except the table of interned line states, so states returned
/// by [`TextAnalyzer::analyze_line`] can be fed back into it. That table only grows; call
/// [`TextAnalyzer::reset`] between unrelated texts.
#[derive(Debug)]
pub struct TextAnalyzer {
    rule: Arc<SyntaxRule>,
    config: HighlightConfig,
    interner: StateInterner,
}

impl TextAnalyzer {
    /// Create an analyzer for `rule`.
    pub fn new(rule: Arc<SyntaxRule>, config: HighlightConfig) -> Self {
        Self {
            interner: StateInterner::new(&rule),
            rule,
            config,
        }
    }

    /// The grammar in use.
    pub fn rule(&self) -> &Arc<SyntaxRule> {
        &self.rule
    }

    /// Drop all interned line states.
    ///
    /// Nested states returned before the reset decode to the initial state afterwards.
    pub fn reset(&mut self) {
        self.interner.clear();
    }

    /// Lex a complete text from the initial state.
    pub fn analyze_text(&mut self, text: &str) -> DocumentHighlight {
        let mut lines = Vec::new();
        let mut info = LineInfo::default();
        for (line_text, ending) in split_lines(text) {
            let result = self.analyze_line(line_text, info);
            lines.push(LineHighlight {
                spans: result.spans,
            });
            info = LineInfo {
                line: info.line + 1,
                start_state: result.end_state,
                start_char_offset: info.start_char_offset + result.char_count + ending.width(),
            };
        }
        DocumentHighlight { lines }
    }

    /// Lex a single line (without terminator).
    pub fn analyze_line(&mut self, text: &str, info: LineInfo) -> LineAnalyzeResult {
        let mut stack = self.interner.decode(info.start_state);
        let spans = lex_line(&self.rule, text, &mut stack);
        let line_start = self.config.show_index.then_some(info.start_char_offset);
        LineAnalyzeResult {
            spans: spans
                .iter()
                .map(|span| TokenSpan::on_line(info.line, span.start, span.end, line_start, span.style))
                .collect(),
            end_state: self.interner.encode(&stack),
            char_count: text.chars().count(),
        }
    }
}
