use crate::analyzer::lexer::{INITIAL_LINE_STATE, LexedSpan, LineState, StateInterner, lex_line};
use crate::error::HighlightError;
use crate::grammar::SyntaxRule;
use lexline_core::{
    Document, DocumentHighlight, HighlightConfig, LineHighlight, LineSplice, TextRange, TokenSpan,
};
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct LexedLine {
    spans: Vec<LexedSpan>,
    exit_state: LineState,
}

/// Stateful analyzer for one open document.
///
/// Keeps the spans and exit state of every line so edits only re-lex until the lexer state
/// converges with what was recorded before the edit.
#[derive(Debug)]
pub struct DocumentAnalyzer {
    document: Document,
    rule: Arc<SyntaxRule>,
    config: HighlightConfig,
    interner: StateInterner,
    lines: Vec<LexedLine>,
    analyzed: bool,
    relexed: Range<usize>,
}

impl DocumentAnalyzer {
    /// Create an analyzer owning `document`. Nothing is lexed until the first call.
    pub fn new(document: Document, rule: Arc<SyntaxRule>, config: HighlightConfig) -> Self {
        Self {
            interner: StateInterner::new(&rule),
            document,
            rule,
            config,
            lines: Vec::new(),
            analyzed: false,
            relexed: 0..0,
        }
    }

    /// The analyzed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The grammar in use.
    pub fn rule(&self) -> &Arc<SyntaxRule> {
        &self.rule
    }

    /// Lines lexed by the last `analyze*` call (end exclusive).
    pub fn relexed_lines(&self) -> Range<usize> {
        self.relexed.clone()
    }

    /// Recorded exit state of `line`, once the document has been analyzed.
    pub fn line_state(&self, line: usize) -> Option<LineState> {
        self.lines.get(line).map(|l| l.exit_state)
    }

    /// Lex the whole document from the initial state.
    pub fn analyze(&mut self) -> DocumentHighlight {
        self.interner.clear();
        self.lines.clear();

        let mut state = INITIAL_LINE_STATE;
        for line in 0..self.document.line_count() {
            let lexed = self.lex_stored_line(line, state);
            state = lexed.exit_state;
            self.lines.push(lexed);
        }
        self.analyzed = true;
        self.relexed = 0..self.lines.len();

        tracing::debug!(
            uri = %self.document.uri(),
            lines = self.lines.len(),
            "analyzed document"
        );
        self.highlight()
    }

    /// Apply an edit addressed by line/column and re-lex the affected lines.
    ///
    /// The range is validated before anything changes.
    pub fn analyze_changes(
        &mut self,
        range: &TextRange,
        new_text: &str,
    ) -> Result<DocumentHighlight, HighlightError> {
        let splice = self.document.patch(range, new_text)?;
        Ok(self.relex_splice(splice))
    }

    /// Apply an edit addressed by absolute indices and re-lex the affected lines.
    pub fn analyze_changes_by_index(
        &mut self,
        start: usize,
        end: usize,
        new_text: &str,
    ) -> Result<DocumentHighlight, HighlightError> {
        let splice = self.document.patch_by_index(start, end, new_text)?;
        Ok(self.relex_splice(splice))
    }

    /// Re-lex one line with its recorded entry state, without touching stored results.
    pub fn analyze_line(&mut self, line: usize) -> Result<LineHighlight, HighlightError> {
        if !self.analyzed {
            self.analyze();
        }
        let text = self.document.line_text(line)?;
        let mut stack = self.interner.decode(self.entry_state(line));
        let spans = lex_line(&self.rule, text, &mut stack);
        Ok(self.materialize(line, &spans))
    }

    /// Current results as typed spans, without lexing.
    pub fn highlight(&self) -> DocumentHighlight {
        DocumentHighlight {
            lines: self
                .lines
                .iter()
                .enumerate()
                .map(|(line, lexed)| self.materialize(line, &lexed.spans))
                .collect(),
        }
    }

    fn relex_splice(&mut self, splice: LineSplice) -> DocumentHighlight {
        if !self.analyzed {
            return self.analyze();
        }

        let start = splice.start_line;
        let old_end_exit = self.lines[start + splice.removed - 1].exit_state;
        self.lines.splice(
            start..start + splice.removed,
            std::iter::repeat_with(LexedLine::default).take(splice.inserted),
        );

        // Replaced lines are always lexed; after them, stop at the first line whose exit state
        // matches the one recorded before the edit.
        let last_inserted = splice.last_inserted_line();
        let mut state = self.entry_state(start);
        let mut line = start;
        while line < self.lines.len() {
            let recorded = match line.cmp(&last_inserted) {
                std::cmp::Ordering::Less => None,
                std::cmp::Ordering::Equal => Some(old_end_exit),
                std::cmp::Ordering::Greater => Some(self.lines[line].exit_state),
            };
            let lexed = self.lex_stored_line(line, state);
            state = lexed.exit_state;
            self.lines[line] = lexed;
            line += 1;
            if recorded == Some(state) {
                tracing::trace!(line = line - 1, "line state converged");
                break;
            }
        }
        self.relexed = start..line;

        tracing::debug!(
            uri = %self.document.uri(),
            start_line = start,
            removed = splice.removed,
            inserted = splice.inserted,
            relexed = line - start,
            "re-analyzed edit"
        );
        self.highlight()
    }

    fn entry_state(&self, line: usize) -> LineState {
        match line.checked_sub(1) {
            Some(prev) => self.lines.get(prev).map_or(INITIAL_LINE_STATE, |l| l.exit_state),
            None => INITIAL_LINE_STATE,
        }
    }

    fn lex_stored_line(&mut self, line: usize, entry: LineState) -> LexedLine {
        let text = self.document.line_text(line).unwrap_or_default();
        let mut stack = self.interner.decode(entry);
        let spans = lex_line(&self.rule, text, &mut stack);
        LexedLine {
            spans,
            exit_state: self.interner.encode(&stack),
        }
    }

    fn materialize(&self, line: usize, spans: &[LexedSpan]) -> LineHighlight {
        let line_start = if self.config.show_index {
            self.document.line_start_index(line).ok()
        } else {
            None
        };
        let mut out = LineHighlight::default();
        for span in spans {
            out.push(TokenSpan::on_line(
                line,
                span.start,
                span.end,
                line_start,
                span.style,
            ));
        }
        out
    }
}
