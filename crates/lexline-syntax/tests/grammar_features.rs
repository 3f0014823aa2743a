use lexline_core::{Document, HighlightConfig, StyleValue, TokenSpan};
use lexline_syntax::{
    HighlightEngine, INITIAL_LINE_STATE, LineInfo, MAX_STACK_DEPTH, SyntaxCompileError,
};
use pretty_assertions::assert_eq;

const CLIKE: &str = include_str!("fixtures/clike.json");
const NEST: &str = include_str!("fixtures/nest.json");
const TEMPLATE: &str = include_str!("fixtures/template.json");
const COMMON: &str = include_str!("fixtures/common.json");
const HOST: &str = include_str!("fixtures/host.json");

fn id(engine: &HighlightEngine, name: &str) -> StyleValue {
    StyleValue::Id(engine.style_id(name).expect("style registered by the grammar"))
}

fn span(line: usize, start: usize, end: usize, style: StyleValue) -> TokenSpan {
    TokenSpan::on_line(line, start, end, None, style)
}

#[test]
fn test_push_pop_nesting_across_lines() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    let rule = engine.compile_syntax_from_json(NEST).unwrap();
    let paren = id(&engine, "paren");
    let inner = id(&engine, "inner");

    let mut analyzer = engine.create_text_analyzer("nest").unwrap();
    let first = analyzer.analyze_line("(a (b", LineInfo::default());
    assert_eq!(
        first.spans,
        vec![
            span(0, 0, 1, paren),
            span(0, 1, 2, inner),
            span(0, 3, 4, paren),
            span(0, 4, 5, inner),
        ]
    );
    // Two frames above the root are interned past the plain state ids.
    assert!(first.end_state >= rule.state_count() as u32);

    let info = LineInfo {
        line: 1,
        start_state: first.end_state,
        start_char_offset: 6,
    };
    let second = analyzer.analyze_line("c) d) e", info);
    assert_eq!(
        second.spans,
        vec![
            span(1, 0, 1, inner),
            span(1, 1, 2, paren),
            span(1, 3, 4, inner),
            span(1, 4, 5, paren),
        ]
    );
    assert_eq!(second.end_state, INITIAL_LINE_STATE);
    assert_eq!(second.char_count, 7);
}

#[test]
fn test_text_analyzer_reset_forgets_nested_states() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(NEST).unwrap();
    let mut analyzer = engine.create_text_analyzer("nest").unwrap();

    let nested = analyzer.analyze_line("(a (b", LineInfo::default()).end_state;
    assert_ne!(nested, INITIAL_LINE_STATE);

    analyzer.reset();
    let info = LineInfo {
        line: 1,
        start_state: nested,
        start_char_offset: 6,
    };
    let after = analyzer.analyze_line("c) d)", info);
    assert!(after.spans.is_empty());
    assert_eq!(after.end_state, INITIAL_LINE_STATE);

    // The table is rebuilt from scratch on the next nested line.
    let again = analyzer.analyze_line("(a (b", LineInfo::default()).end_state;
    assert_eq!(again, nested);
}

#[test]
fn test_deep_push_stays_bounded() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(NEST).unwrap();
    let mut analyzer = engine.create_text_analyzer("nest").unwrap();

    let deep = "(".repeat(MAX_STACK_DEPTH * 2);
    let opened = analyzer.analyze_line(&deep, LineInfo::default());
    let closers = ")".repeat(MAX_STACK_DEPTH - 1);
    let info = LineInfo {
        start_state: opened.end_state,
        ..LineInfo::default()
    };
    let closed = analyzer.analyze_line(&closers, info);
    assert_eq!(closed.end_state, INITIAL_LINE_STATE);
}

#[test]
fn test_on_line_end_state_resets_unterminated_string() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(CLIKE).unwrap();
    let string = id(&engine, "string");
    let keyword = id(&engine, "keyword");

    let handle = engine
        .load_document(Document::new("file:///s.clk", "let s = \"abc\nif"))
        .unwrap();
    let result = engine.analyze(handle);
    assert_eq!(
        result.lines[0].spans,
        vec![span(0, 0, 3, keyword), span(0, 8, 12, string)]
    );
    assert_eq!(result.lines[1].spans, vec![span(1, 0, 2, keyword)]);
    assert_eq!(engine.analyzer(handle).unwrap().line_state(0), Some(0));
}

#[test]
fn test_sub_states_relex_groups() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(TEMPLATE).unwrap();
    let tag = id(&engine, "tag");
    let keyword = id(&engine, "keyword");
    let number = id(&engine, "number");
    let interpolation = id(&engine, "interpolation");

    let mut analyzer = engine.create_text_analyzer_by_extension("tpl").unwrap();
    let result = analyzer.analyze_text("<script>var x = 1</script> ${new 2}");
    assert_eq!(
        result.lines[0].spans,
        vec![
            span(0, 0, 8, tag),
            span(0, 8, 11, keyword),
            span(0, 16, 17, number),
            span(0, 17, 26, tag),
            span(0, 27, 29, interpolation),
            span(0, 29, 32, keyword),
            span(0, 32, 33, interpolation),
            span(0, 33, 34, number),
            span(0, 34, 35, interpolation),
        ]
    );
}

#[test]
fn test_macros_gate_rules_and_import_splices_grammar() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(COMMON).unwrap();
    engine.compile_syntax_from_json(HOST).unwrap();
    let keyword = id(&engine, "keyword");
    let number = id(&engine, "number");
    let string = id(&engine, "string");

    let text = "android desktop 12 'a b'";
    let mut analyzer = engine.create_text_analyzer("host").unwrap();
    assert_eq!(
        analyzer.analyze_text(text).lines[0].spans,
        vec![
            span(0, 8, 15, keyword),
            span(0, 16, 18, number),
            span(0, 19, 24, string),
        ]
    );

    engine.define_macro("ANDROID");
    assert!(engine.is_macro_defined("ANDROID"));
    let rule = engine.compile_syntax_from_json(HOST).unwrap();
    assert_eq!(rule.state_id("common::quote"), Some(1));

    let mut analyzer = engine.create_text_analyzer("host").unwrap();
    assert_eq!(
        analyzer.analyze_text(text).lines[0].spans,
        vec![
            span(0, 0, 7, keyword),
            span(0, 16, 18, number),
            span(0, 19, 24, string),
        ]
    );

    engine.undefine_macro("ANDROID");
    assert!(!engine.is_macro_defined("ANDROID"));
}

#[test]
fn test_imported_states_carry_across_lines() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(COMMON).unwrap();
    let rule = engine.compile_syntax_from_json(HOST).unwrap();
    let string = id(&engine, "string");

    let handle = engine
        .load_document(Document::new("file:///x.host", "'open\nstill' 1"))
        .unwrap();
    let result = engine.analyze(handle);
    assert_eq!(result.lines[1].spans[0], span(1, 0, 6, string));
    assert_eq!(
        engine.analyzer(handle).unwrap().line_state(0),
        Some(rule.state_count() as u32)
    );
}

#[test]
fn test_registered_style_ids_are_respected() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.register_style_name("keyword", 100);
    engine.compile_syntax_from_json(CLIKE).unwrap();

    assert_eq!(engine.style_id("keyword"), Some(100));
    assert_eq!(engine.style_name(100), Some("keyword"));
    assert_eq!(engine.style_id("default"), Some(0));
    let comment = engine.style_id("comment").unwrap();
    assert!(comment != 0 && comment != 100);

    let mut analyzer = engine.create_text_analyzer("clike").unwrap();
    assert_eq!(
        analyzer.analyze_text("if").lines[0].spans[0].style,
        StyleValue::Id(100)
    );
}

#[test]
fn test_compile_errors() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    let compile = |engine: &mut HighlightEngine, json: &str| {
        engine
            .compile_syntax_from_json(json)
            .expect_err("grammar should be rejected")
    };

    assert!(matches!(
        compile(&mut engine, "{ not json"),
        SyntaxCompileError::Json(_)
    ));
    assert!(matches!(
        compile(&mut engine, r#"{ "fileExtension": "x", "states": { "default": [] } }"#),
        SyntaxCompileError::MissingProperty("name")
    ));
    assert!(matches!(
        compile(&mut engine, r#"{ "name": "x", "fileExtension": "x", "states": { "main": [] } }"#),
        SyntaxCompileError::MissingProperty("states.default")
    ));
    assert!(matches!(
        compile(
            &mut engine,
            r#"{ "name": "x", "fileExtension": "x", "states": { "default": [
                { "pattern": "a", "style": "s", "push": "missing" } ] } }"#
        ),
        SyntaxCompileError::UnknownState(name) if name == "missing"
    ));
    assert!(matches!(
        compile(
            &mut engine,
            r#"{ "name": "x", "fileExtension": "x", "states": { "default": [
                { "pattern": "(unclosed", "style": "s" } ] } }"#
        ),
        SyntaxCompileError::Pattern { .. }
    ));
    assert!(matches!(
        compile(
            &mut engine,
            r#"{ "name": "x", "fileExtension": "x", "states": { "default": [
                { "pattern": "${nope}", "style": "s" } ] } }"#
        ),
        SyntaxCompileError::UnknownVariable(name) if name == "nope"
    ));
    assert!(matches!(
        compile(
            &mut engine,
            r#"{ "name": "x", "fileExtension": "x",
                "variables": { "a": "${b}", "b": "${a}" },
                "states": { "default": [ { "pattern": "${a}", "style": "s" } ] } }"#
        ),
        SyntaxCompileError::CircularVariable(_)
    ));
    assert!(matches!(
        compile(
            &mut engine,
            r#"{ "name": "x", "fileExtension": "x", "states": { "default": [
                { "importSyntax": "never-compiled" } ] } }"#
        ),
        SyntaxCompileError::UnknownSyntax(name) if name == "never-compiled"
    ));
    assert!(matches!(
        compile(
            &mut engine,
            r#"{ "name": "x", "fileExtension": "x", "states": { "default": [
                { "pattern": "(a)", "styles": [2, "s"] } ] } }"#
        ),
        SyntaxCompileError::InvalidProperty { .. }
    ));
    assert!(matches!(
        compile(
            &mut engine,
            r#"{ "name": "x", "fileExtension": "x", "states": { "default": [
                { "pattern": "a" } ] } }"#
        ),
        SyntaxCompileError::InvalidProperty { .. }
    ));

    // Nothing was registered by the failed compilations.
    assert!(engine.syntax_rule_by_name("x").is_none());
}

#[test]
fn test_inline_mode_requires_styles_table() {
    let config = HighlightConfig {
        inline_style: true,
        ..HighlightConfig::default()
    };
    let mut engine = HighlightEngine::new(config);
    assert!(matches!(
        engine.compile_syntax_from_json(CLIKE),
        Err(SyntaxCompileError::MissingProperty("styles"))
    ));
}

#[test]
fn test_compile_from_file() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    let dir = std::env::temp_dir().join(format!("lexline-grammar-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let grammar = dir.join("nest.json");
    std::fs::write(&grammar, NEST).unwrap();
    let rule = engine.compile_syntax_from_file(&grammar).unwrap();
    assert_eq!(rule.name(), "nest");

    let empty = dir.join("empty.json");
    std::fs::write(&empty, "  \n").unwrap();
    assert!(matches!(
        engine.compile_syntax_from_file(&empty),
        Err(SyntaxCompileError::EmptyFile(path)) if path == empty
    ));
    assert!(matches!(
        engine.compile_syntax_from_file(dir.join("missing.json")),
        Err(SyntaxCompileError::Io(_))
    ));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_rule_lookup_and_replacement() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(CLIKE).unwrap();

    assert!(engine.syntax_rule_by_extension(".cl").is_some());
    assert!(engine.syntax_rule_by_extension("cl").is_some());
    assert!(engine.syntax_rule_by_extension(".clk").is_some());
    assert!(engine.syntax_rule_by_extension(".rs").is_none());
    assert!(engine.create_text_analyzer("missing").is_none());

    let replacement = CLIKE.replace("\"clk\"", "\"clike2\"");
    engine.compile_syntax_from_json(&replacement).unwrap();
    assert!(engine.syntax_rule_by_extension("clk").is_none());
    assert!(engine.syntax_rule_by_extension("clike2").is_some());
}

#[test]
fn test_document_handles() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    engine.compile_syntax_from_json(CLIKE).unwrap();

    assert!(
        engine
            .load_document(Document::new("file:///notes.txt", "if"))
            .is_none()
    );

    let a = engine
        .load_document(Document::new("file:///a.cl", "if"))
        .unwrap();
    let b = engine
        .load_document(Document::new("file:///b.cl", "else"))
        .unwrap();
    assert_ne!(a, b);
    assert_eq!(engine.document_count(), 2);

    assert!(engine.remove_document(a));
    assert!(!engine.remove_document(a));
    assert!(engine.analyze(a).is_empty());
    assert!(engine.analyze_line(a, 0).unwrap().is_empty());
    assert!(engine.document(a).is_none());

    assert!(engine.close_document("file:///b.cl"));
    assert!(!engine.close_document("file:///b.cl"));
    assert_eq!(engine.document_count(), 0);
    assert!(
        engine
            .analyze_changes_by_index(b, 0, 0, "x")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_rejected_grammar_leaves_style_names_unregistered() {
    let mut engine = HighlightEngine::new(HighlightConfig::default());
    assert!(
        engine
            .compile_syntax_from_json(
                r#"{ "name": "x", "fileExtension": "x", "states": { "default": [
                    { "pattern": "a", "style": "orphan" },
                    { "pattern": "b", "style": "s", "push": "missing" } ] } }"#,
            )
            .is_err()
    );
    assert_eq!(engine.style_id("orphan"), None);
    assert_eq!(engine.style_id("s"), None);

    engine.compile_syntax_from_json(CLIKE).unwrap();
    assert!(engine.style_id("keyword").is_some());
}
