//! Script-zone harvesting.
//!
//! The syntax-tree strategy is tried first. If it cannot produce a clean
//! tree the pattern scan takes over for that source, so a parse problem
//! never drops the whole file.

use super::Candidate;
use crate::source_tree::SourceKind;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

/// Minimum quoted length picked up by the pattern scan
pub const PATTERN_SCAN_MIN_LEN: usize = 4;

/// One way of pulling candidate strings out of script source.
pub trait ScriptStrategy {
    fn name(&self) -> &'static str;

    fn harvest(&mut self, source: &str, kind: SourceKind) -> Result<Vec<Candidate>>;
}

fn language_for(kind: SourceKind) -> Language {
    match kind {
        SourceKind::TypeScript => tree_sitter_typescript::language_typescript(),
        SourceKind::Tsx => tree_sitter_typescript::language_tsx(),
        SourceKind::JavaScript | SourceKind::Jsx | SourceKind::Component => {
            tree_sitter_javascript::language()
        }
    }
}

/// Tree-sitter based harvesting
#[derive(Default)]
pub struct SyntaxTreeStrategy {
    parsers: HashMap<SourceKind, Parser>,
}

impl SyntaxTreeStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn parser(&mut self, kind: SourceKind) -> Result<&mut Parser> {
        match self.parsers.entry(kind) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let mut parser = Parser::new();
                parser
                    .set_language(language_for(kind))
                    .context("Failed to set parser language")?;
                Ok(e.insert(parser))
            }
        }
    }
}

impl ScriptStrategy for SyntaxTreeStrategy {
    fn name(&self) -> &'static str {
        "syntax-tree"
    }

    fn harvest(&mut self, source: &str, kind: SourceKind) -> Result<Vec<Candidate>> {
        let tree = self
            .parser(kind)?
            .parse(source, None)
            .context("Parser produced no syntax tree")?;
        let root = tree.root_node();
        if root.has_error() {
            anyhow::bail!("Syntax error in script source");
        }

        let mut candidates = Vec::new();
        let mut cursor = root.walk();

        'walk: loop {
            collect_node(cursor.node(), source, &mut candidates);

            if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }

        Ok(candidates)
    }
}

fn collect_node(node: Node, source: &str, out: &mut Vec<Candidate>) {
    match node.kind() {
        "string" => {
            if is_excluded_literal(node, source) || node.end_byte() - node.start_byte() < 2 {
                return;
            }
            let inner = &source[node.start_byte() + 1..node.end_byte() - 1];
            push_trimmed(out, inner, "script-string");
        }
        "template_string" => {
            if is_tagged_template(node) {
                return;
            }
            for segment in template_segments(node, source) {
                push_trimmed(out, segment, "template-literal");
            }
        }
        "jsx_text" => {
            if let Some(text) = source.get(node.start_byte()..node.end_byte()) {
                push_trimmed(out, text, "jsx-text");
            }
        }
        _ => {}
    }
}

fn push_trimmed(out: &mut Vec<Candidate>, text: &str, context: &str) {
    let text = text.trim();
    if !text.is_empty() {
        out.push(Candidate::new(text, context));
    }
}

/// Literals that name modules or keys rather than carry text
fn is_excluded_literal(node: Node, source: &str) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };

    match parent.kind() {
        "import_statement" | "export_statement" | "import_require_clause" => true,
        // directive prologue, e.g. 'use strict'
        "expression_statement" => true,
        // TypeScript string literal types
        "literal_type" => true,
        "pair" | "property_signature" | "public_field_definition" | "method_definition" => {
            is_field(parent, "key", node) || is_field(parent, "name", node)
        }
        "call_expression" => is_field(parent, "function", node),
        "subscript_expression" => is_field(parent, "index", node),
        "arguments" => parent
            .parent()
            .filter(|call| call.kind() == "call_expression")
            .and_then(|call| call.child_by_field_name("function"))
            .map(|callee| {
                callee.kind() == "import"
                    || source.get(callee.start_byte()..callee.end_byte()) == Some("require")
            })
            .unwrap_or(false),
        _ => false,
    }
}

fn is_field(parent: Node, field: &str, node: Node) -> bool {
    parent.child_by_field_name(field) == Some(node)
}

/// css`...`, gql`...` and similar tagged templates hold code, not copy
fn is_tagged_template(node: Node) -> bool {
    node.parent()
        .map(|p| p.kind() == "call_expression" && is_field(p, "arguments", node))
        .unwrap_or(false)
}

/// Static text of a template literal, split around `${...}` substitutions
fn template_segments<'a>(node: Node, source: &'a str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let end = node.end_byte().saturating_sub(1);
    let mut pos = node.start_byte() + 1;

    for i in 0..node.child_count() {
        let Some(child) = node.child(i) else { continue };
        if child.kind() == "template_substitution" {
            if let Some(segment) = source.get(pos..child.start_byte()) {
                segments.push(segment);
            }
            pos = child.end_byte();
        }
    }
    if let Some(segment) = source.get(pos..end) {
        segments.push(segment);
    }

    segments
}

static QUOTED: OnceLock<Regex> = OnceLock::new();
static SUBSTITUTION: OnceLock<Regex> = OnceLock::new();

/// Regex scan over quoted substrings
#[derive(Debug, Default)]
pub struct PatternScanStrategy;

impl PatternScanStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptStrategy for PatternScanStrategy {
    fn name(&self) -> &'static str {
        "pattern-scan"
    }

    fn harvest(&mut self, source: &str, _kind: SourceKind) -> Result<Vec<Candidate>> {
        let quoted_re = QUOTED.get_or_init(|| {
            Regex::new(&format!(
                r#"'([^'\\\n]{{{n},}})'|"([^"\\\n]{{{n},}})"|`([^`\\]{{{n},}})`"#,
                n = PATTERN_SCAN_MIN_LEN
            ))
            .unwrap()
        });
        let substitution_re =
            SUBSTITUTION.get_or_init(|| Regex::new(r"\$\{[^}]*\}").unwrap());

        let mut candidates = Vec::new();

        for cap in quoted_re.captures_iter(source) {
            let Some(whole) = cap.get(0) else { continue };
            if is_module_line(source, whole.start())
                || is_property_key(source, whole.start(), whole.end())
            {
                continue;
            }

            if let Some(m) = cap.get(1).or_else(|| cap.get(2)) {
                push_trimmed(&mut candidates, m.as_str(), "script-string");
            } else if let Some(m) = cap.get(3) {
                for segment in substitution_re.split(m.as_str()) {
                    push_trimmed(&mut candidates, segment, "template-literal");
                }
            }
        }

        Ok(candidates)
    }
}

fn line_around(source: &str, offset: usize) -> &str {
    let start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = source[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(source.len());
    &source[start..end]
}

fn is_module_line(source: &str, offset: usize) -> bool {
    let line = line_around(source, offset).trim_start();
    line.starts_with("import ")
        || (line.starts_with("export ") && line.contains(" from "))
        || line.contains("require(")
        || line.contains("import(")
}

fn is_property_key(source: &str, start: usize, end: usize) -> bool {
    let before = source[..start].trim_end();
    let after = source[end..].trim_start();
    after.starts_with(':') && (before.ends_with('{') || before.ends_with(','))
}

/// Runs the primary strategy and falls back when it fails.
pub struct ScriptHarvester {
    primary: Box<dyn ScriptStrategy>,
    fallback: Box<dyn ScriptStrategy>,
}

impl Default for ScriptHarvester {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptHarvester {
    pub fn new() -> Self {
        Self::with_strategies(
            Box::new(SyntaxTreeStrategy::new()),
            Box::new(PatternScanStrategy::new()),
        )
    }

    pub fn with_strategies(
        primary: Box<dyn ScriptStrategy>,
        fallback: Box<dyn ScriptStrategy>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Harvest `source`; `origin` is only used in log lines.
    pub fn harvest(
        &mut self,
        source: &str,
        kind: SourceKind,
        origin: &str,
    ) -> Result<Vec<Candidate>> {
        match self.primary.harvest(source, kind) {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                debug!(
                    "{}: {} failed ({}), falling back to {}",
                    origin,
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.harvest(source, kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.text.as_str()).collect()
    }

    fn tree(source: &str, kind: SourceKind) -> Vec<Candidate> {
        SyntaxTreeStrategy::new()
            .harvest(source, kind)
            .expect("source should parse")
    }

    #[test]
    fn test_tree_collects_string_literals() {
        let candidates = tree(
            "const msg = 'Saved successfully';\nalert(\"Something went wrong\");",
            SourceKind::JavaScript,
        );
        assert_eq!(
            texts(&candidates),
            vec!["Saved successfully", "Something went wrong"]
        );
        assert!(candidates.iter().all(|c| c.context == "script-string"));
    }

    #[test]
    fn test_tree_skips_imports_keys_and_directives() {
        let source = r#"'use strict';
import { ref } from 'vue';
const mod = require('some module');
const lazy = () => import('./views/Lazy View.vue');
const labels = { 'Dialog title': 'Confirm deletion' };
const value = labels['Dialog title'];
"#;
        let candidates = tree(source, SourceKind::JavaScript);
        assert_eq!(texts(&candidates), vec!["Confirm deletion"]);
    }

    #[test]
    fn test_tree_template_literal_segments() {
        let candidates = tree(
            "const s = `Welcome back, ${user.name}! You have ${count} new messages`;",
            SourceKind::JavaScript,
        );
        assert_eq!(
            texts(&candidates),
            vec!["Welcome back,", "! You have", "new messages"]
        );
        assert!(candidates.iter().all(|c| c.context == "template-literal"));
    }

    #[test]
    fn test_tree_skips_tagged_templates() {
        let candidates = tree(
            "const style = css`color: red; font-weight: bold`;",
            SourceKind::JavaScript,
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_tree_typescript_literal_types_skipped() {
        let source = "type Mode = 'light mode' | 'dark mode';\nconst label: string = 'Choose a theme';";
        let candidates = tree(source, SourceKind::TypeScript);
        assert_eq!(texts(&candidates), vec!["Choose a theme"]);
    }

    #[test]
    fn test_tree_jsx_text() {
        let candidates = tree(
            "const View = () => <div title=\"Tooltip text\">Click here to continue</div>;",
            SourceKind::Jsx,
        );
        let jsx: Vec<&str> = candidates
            .iter()
            .filter(|c| c.context == "jsx-text")
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(jsx, vec!["Click here to continue"]);
        assert!(texts(&candidates).contains(&"Tooltip text"));
    }

    #[test]
    fn test_tree_reports_syntax_errors() {
        let result =
            SyntaxTreeStrategy::new().harvest("const = 'Broken file' ((", SourceKind::JavaScript);
        assert!(result.is_err());
    }

    #[test]
    fn test_pattern_scan_min_length_and_skips() {
        let source = r#"import x from 'some module path';
const a = 'abc';
const b = "Upload complete";
const c = { 'Header key': 'Value text' };
"#;
        let candidates = PatternScanStrategy::new()
            .harvest(source, SourceKind::JavaScript)
            .unwrap();
        assert_eq!(texts(&candidates), vec!["Upload complete", "Value text"]);
    }

    #[test]
    fn test_pattern_scan_template_segments() {
        let candidates = PatternScanStrategy::new()
            .harvest("const s = `Hello ${name}, welcome`;", SourceKind::JavaScript)
            .unwrap();
        assert_eq!(texts(&candidates), vec!["Hello", ", welcome"]);
    }

    #[test]
    fn test_harvester_falls_back_on_parse_error() {
        let mut harvester = ScriptHarvester::new();
        let candidates = harvester
            .harvest(
                "const broken = 'Still extracted' ((( {",
                SourceKind::JavaScript,
                "broken.js",
            )
            .unwrap();
        assert_eq!(texts(&candidates), vec!["Still extracted"]);
    }

    struct FailingStrategy;

    impl ScriptStrategy for FailingStrategy {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn harvest(&mut self, _source: &str, _kind: SourceKind) -> Result<Vec<Candidate>> {
            anyhow::bail!("always fails")
        }
    }

    #[test]
    fn test_harvester_uses_injected_fallback() {
        let mut harvester = ScriptHarvester::with_strategies(
            Box::new(FailingStrategy),
            Box::new(PatternScanStrategy::new()),
        );
        let candidates = harvester
            .harvest("const t = 'Fallback text';", SourceKind::JavaScript, "a.js")
            .unwrap();
        assert_eq!(texts(&candidates), vec!["Fallback text"]);
    }
}
