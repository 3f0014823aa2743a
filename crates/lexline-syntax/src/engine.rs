use crate::analyzer::{DocumentAnalyzer, TextAnalyzer};
use crate::error::HighlightError;
use crate::grammar::{CompileContext, SyntaxCompileError, SyntaxRule};
use lexline_core::{
    Document, DocumentHighlight, HighlightConfig, LineHighlight, StyleId, StyleRegistry, TextRange,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Handle of a document owned by a [`HighlightEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    /// Raw numeric value, for hosts that pass handles across a boundary.
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Rebuild a handle from [`DocumentHandle::as_raw`].
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Owns compiled grammars, the style registry, macros and open documents.
///
/// Grammars are compiled through `&mut self` and shared as `Arc<SyntaxRule>`; documents are
/// addressed by [`DocumentHandle`]. Calls with a released handle return empty results.
#[derive(Debug, Default)]
pub struct HighlightEngine {
    config: HighlightConfig,
    styles: StyleRegistry,
    macros: HashSet<String>,
    rules: Vec<Arc<SyntaxRule>>,
    documents: HashMap<DocumentHandle, DocumentAnalyzer>,
    next_handle: u64,
}

impl HighlightEngine {
    /// Create an engine.
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> HighlightConfig {
        self.config
    }

    /// Compile a JSON grammar and register it.
    ///
    /// A grammar with the same name replaces the previous one for documents loaded afterwards.
    pub fn compile_syntax_from_json(
        &mut self,
        json: &str,
    ) -> Result<Arc<SyntaxRule>, SyntaxCompileError> {
        let mut ctx = CompileContext {
            styles: &mut self.styles,
            macros: &self.macros,
            rules: &self.rules,
            inline_style: self.config.inline_style,
        };
        let rule = Arc::new(SyntaxRule::compile_json(json, &mut ctx)?);
        self.rules.retain(|existing| existing.name() != rule.name());
        self.rules.push(rule.clone());
        Ok(rule)
    }

    /// Read and compile a grammar file.
    pub fn compile_syntax_from_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<SyntaxRule>, SyntaxCompileError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        if json.trim().is_empty() {
            return Err(SyntaxCompileError::EmptyFile(path.to_path_buf()));
        }
        self.compile_syntax_from_json(&json)
    }

    /// Look up a compiled grammar by name.
    pub fn syntax_rule_by_name(&self, name: &str) -> Option<Arc<SyntaxRule>> {
        self.rules.iter().find(|rule| rule.name() == name).cloned()
    }

    /// Look up a compiled grammar by file extension (leading `.` optional).
    pub fn syntax_rule_by_extension(&self, extension: &str) -> Option<Arc<SyntaxRule>> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches_extension(extension))
            .cloned()
    }

    /// Bind a style name to a host-chosen id. Register names before compiling grammars.
    pub fn register_style_name(&mut self, name: &str, id: StyleId) {
        self.styles.register_style_name(name, id);
    }

    /// Name bound to a style id.
    pub fn style_name(&self, id: StyleId) -> Option<&str> {
        self.styles.style_name(id)
    }

    /// Id bound to a style name.
    pub fn style_id(&self, name: &str) -> Option<StyleId> {
        self.styles.style_id(name)
    }

    /// Define a macro for `#ifdef`/`#ifndef` guards in grammars compiled afterwards.
    pub fn define_macro(&mut self, name: &str) {
        self.macros.insert(name.to_string());
    }

    /// Remove a macro definition.
    pub fn undefine_macro(&mut self, name: &str) {
        self.macros.remove(name);
    }

    /// Check whether a macro is defined.
    pub fn is_macro_defined(&self, name: &str) -> bool {
        self.macros.contains(name)
    }

    /// Open a document, choosing the grammar from its URI extension.
    ///
    /// Returns `None` when no compiled grammar handles the extension.
    pub fn load_document(&mut self, document: Document) -> Option<DocumentHandle> {
        let Some(rule) = document
            .extension()
            .and_then(|ext| self.syntax_rule_by_extension(ext))
        else {
            tracing::debug!(uri = %document.uri(), "no syntax rule for document");
            return None;
        };
        Some(self.load_document_with_rule(document, rule))
    }

    /// Open a document with an explicit grammar.
    pub fn load_document_with_rule(
        &mut self,
        document: Document,
        rule: Arc<SyntaxRule>,
    ) -> DocumentHandle {
        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(
            uri = %document.uri(),
            syntax = %rule.name(),
            handle = handle.0,
            "loaded document"
        );
        self.documents
            .insert(handle, DocumentAnalyzer::new(document, rule, self.config));
        handle
    }

    /// Full analysis of an open document.
    pub fn analyze(&mut self, handle: DocumentHandle) -> DocumentHighlight {
        match self.analyzer_mut(handle) {
            Some(analyzer) => analyzer.analyze(),
            None => DocumentHighlight::default(),
        }
    }

    /// Apply an edit addressed by line/column and return the updated highlighting.
    pub fn analyze_changes(
        &mut self,
        handle: DocumentHandle,
        range: &TextRange,
        new_text: &str,
    ) -> Result<DocumentHighlight, HighlightError> {
        match self.analyzer_mut(handle) {
            Some(analyzer) => analyzer.analyze_changes(range, new_text),
            None => Ok(DocumentHighlight::default()),
        }
    }

    /// Apply an edit addressed by absolute indices and return the updated highlighting.
    pub fn analyze_changes_by_index(
        &mut self,
        handle: DocumentHandle,
        start: usize,
        end: usize,
        new_text: &str,
    ) -> Result<DocumentHighlight, HighlightError> {
        match self.analyzer_mut(handle) {
            Some(analyzer) => analyzer.analyze_changes_by_index(start, end, new_text),
            None => Ok(DocumentHighlight::default()),
        }
    }

    /// Re-lex one line of an open document.
    pub fn analyze_line(
        &mut self,
        handle: DocumentHandle,
        line: usize,
    ) -> Result<LineHighlight, HighlightError> {
        match self.analyzer_mut(handle) {
            Some(analyzer) => analyzer.analyze_line(line),
            None => Ok(LineHighlight::default()),
        }
    }

    /// The document behind a handle.
    pub fn document(&self, handle: DocumentHandle) -> Option<&Document> {
        self.documents.get(&handle).map(DocumentAnalyzer::document)
    }

    /// The analyzer behind a handle.
    pub fn analyzer(&self, handle: DocumentHandle) -> Option<&DocumentAnalyzer> {
        self.documents.get(&handle)
    }

    /// Mutable access to the analyzer behind a handle.
    pub fn analyzer_mut(&mut self, handle: DocumentHandle) -> Option<&mut DocumentAnalyzer> {
        let analyzer = self.documents.get_mut(&handle);
        if analyzer.is_none() {
            tracing::debug!(handle = handle.0, "unknown or released document handle");
        }
        analyzer
    }

    /// Release a document. Returns `false` if the handle was already released.
    pub fn remove_document(&mut self, handle: DocumentHandle) -> bool {
        self.documents.remove(&handle).is_some()
    }

    /// Release every open document with the given URI.
    pub fn close_document(&mut self, uri: &str) -> bool {
        let before = self.documents.len();
        self.documents
            .retain(|_, analyzer| analyzer.document().uri() != uri);
        before != self.documents.len()
    }

    /// Number of open documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Create a stateless analyzer for a grammar name.
    pub fn create_text_analyzer(&self, syntax_name: &str) -> Option<TextAnalyzer> {
        self.syntax_rule_by_name(syntax_name)
            .map(|rule| TextAnalyzer::new(rule, self.config))
    }

    /// Create a stateless analyzer for a file extension.
    pub fn create_text_analyzer_by_extension(&self, extension: &str) -> Option<TextAnalyzer> {
        self.syntax_rule_by_extension(extension)
            .map(|rule| TextAnalyzer::new(rule, self.config))
    }
}
