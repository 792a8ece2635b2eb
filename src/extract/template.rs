//! Single-file component zones and the markup harvester.

use super::Candidate;
use crate::source_tree::SourceKind;
use regex::Regex;
use std::sync::OnceLock;

/// Attributes whose static values are shown to the user
pub const TEXT_ATTRIBUTES: &[&str] = &[
    "title",
    "placeholder",
    "alt",
    "aria-label",
    "label",
    "tooltip",
    "content",
    "description",
    "confirm-text",
    "cancel-text",
    "empty-text",
    "loading-text",
];

static TEMPLATE_ZONE: OnceLock<Regex> = OnceLock::new();
static SCRIPT_ZONE: OnceLock<Regex> = OnceLock::new();
static LANG_ATTR: OnceLock<Regex> = OnceLock::new();
static COMMENT: OnceLock<Regex> = OnceLock::new();
static TEXT_NODE: OnceLock<Regex> = OnceLock::new();
static MUSTACHE: OnceLock<Regex> = OnceLock::new();
static LITERAL_MUSTACHE: OnceLock<Regex> = OnceLock::new();
static STATIC_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

/// A `<script>` block of a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptZone {
    pub content: String,
    pub kind: SourceKind,
    pub setup: bool,
}

/// The zones of a single-file component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentZones {
    pub template: Option<String>,
    pub scripts: Vec<ScriptZone>,
}

impl ComponentZones {
    /// Split a component into its template and script zones.
    ///
    /// The template zone runs from the first `<template>` to the last
    /// `</template>` so nested templates stay inside it.
    pub fn split(source: &str) -> Self {
        let template_re = TEMPLATE_ZONE
            .get_or_init(|| Regex::new(r"(?s)<template(?:\s[^>]*)?>(.*)</template>").unwrap());
        let script_re = SCRIPT_ZONE
            .get_or_init(|| Regex::new(r"(?s)<script(\s[^>]*)?>(.*?)</script>").unwrap());
        let lang_re = LANG_ATTR
            .get_or_init(|| Regex::new(r#"lang\s*=\s*["']?(\w+)"#).unwrap());

        let template = template_re
            .captures(source)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let scripts = script_re
            .captures_iter(source)
            .map(|cap| {
                let attrs = cap.get(1).map(|m| m.as_str()).unwrap_or("");
                let kind = match lang_re
                    .captures(attrs)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
                {
                    Some("ts") => SourceKind::TypeScript,
                    Some("tsx") => SourceKind::Tsx,
                    Some("jsx") => SourceKind::Jsx,
                    _ => SourceKind::JavaScript,
                };
                ScriptZone {
                    content: cap.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    kind,
                    setup: attrs.split_whitespace().any(|a| a == "setup"),
                }
            })
            .collect();

        Self { template, scripts }
    }
}

/// Harvest text nodes, static attributes and literal-only interpolations.
pub fn harvest_template(template: &str) -> Vec<Candidate> {
    let comment_re = COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
    let text_re = TEXT_NODE.get_or_init(|| Regex::new(r">([^<>]+)<").unwrap());
    let mustache_re = MUSTACHE.get_or_init(|| Regex::new(r"(?s)\{\{.*?\}\}").unwrap());
    let literal_re = LITERAL_MUSTACHE.get_or_init(|| {
        Regex::new(r#"\{\{\s*(?:'([^'\\]*)'|"([^"\\]*)"|`([^`$\\]*)`)\s*\}\}"#).unwrap()
    });
    let attr_re = STATIC_ATTRIBUTE.get_or_init(|| {
        let names = TEXT_ATTRIBUTES
            .iter()
            .map(|a| regex::escape(a))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(
            r#"\s({})\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
            names
        ))
        .unwrap()
    });

    let markup = comment_re.replace_all(template, "");
    let mut candidates = Vec::new();

    for cap in text_re.captures_iter(&markup) {
        let Some(node) = cap.get(1) else { continue };
        for segment in mustache_re.split(node.as_str()) {
            let text = segment.trim();
            if !text.is_empty() {
                candidates.push(Candidate::new(text, "template-text"));
            }
        }
    }

    for cap in attr_re.captures_iter(&markup) {
        let name = &cap[1];
        let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str().trim());
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            candidates.push(Candidate::new(value, &format!("attribute-{}", name)));
        }
    }

    for cap in literal_re.captures_iter(&markup) {
        let literal = cap
            .get(1)
            .or_else(|| cap.get(2))
            .or_else(|| cap.get(3))
            .map(|m| m.as_str().trim());
        if let Some(literal) = literal.filter(|l| !l.is_empty()) {
            candidates.push(Candidate::new(literal, "template-interpolation"));
        }
    }

    candidates
}
