//! Translation quality checks.
//!
//! A translation must carry over every interpolation placeholder, format
//! specifier and markup tag of its original. Losing or altering a `{{ }}` or
//! `${}` expression breaks the rewritten source, so those mismatches are
//! errors; the rest are warnings.

use regex::Regex;
use std::sync::OnceLock;

/// Errors and warnings about one translation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

static MUSTACHE_REGEX: OnceLock<Regex> = OnceLock::new();
static NAMED_REGEX: OnceLock<Regex> = OnceLock::new();
static FORMAT_REGEX: OnceLock<Regex> = OnceLock::new();
static SUBSTITUTION_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Checks placeholders survive translation
pub struct PlaceholderValidator;

impl PlaceholderValidator {
    /// Compare `original` and `translated` token by token.
    ///
    /// Token order is ignored since target languages may reorder
    /// placeholders.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        // (label, extractor, mismatch is an error)
        let checks: [(&str, fn(&str) -> Vec<String>, bool); 5] = [
            ("Interpolation", Self::extract_mustaches, true),
            ("Named placeholder", Self::extract_named, false),
            ("Format specifier", Self::extract_format_specifiers, false),
            ("Template substitution", Self::extract_substitutions, true),
            ("HTML tag", Self::extract_tags, false),
        ];

        for (label, extract, fatal) in checks {
            let mut orig = extract(original);
            let mut trans = extract(translated);
            orig.sort();
            trans.sort();
            if orig == trans {
                continue;
            }
            let message = format!(
                "{} mismatch: original has {:?}, translation has {:?}",
                label, orig, trans
            );
            if fatal {
                report.errors.push(message);
            } else {
                report.warnings.push(message);
            }
        }

        report
    }

    /// `{{ expr }}`, whitespace-normalised
    fn extract_mustaches(text: &str) -> Vec<String> {
        let regex = MUSTACHE_REGEX.get_or_init(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| format!("{{{{{}}}}}", m.as_str())))
            .collect()
    }

    /// `{name}` and `{0}`, excluding the braces of `{{ }}` and `${ }`
    fn extract_named(text: &str) -> Vec<String> {
        let regex = NAMED_REGEX.get_or_init(|| Regex::new(r"(^|[^{$])\{(\w+)\}").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(2).map(|m| format!("{{{}}}", m.as_str())))
            .collect()
    }

    /// printf-style `%s`, `%d`, `%1$s`
    fn extract_format_specifiers(text: &str) -> Vec<String> {
        let regex = FORMAT_REGEX
            .get_or_init(|| Regex::new(r"%(\d+\$)?[-+0#]*\d*(\.\d+)?[sdifuxXoc@]").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// `${expr}`
    fn extract_substitutions(text: &str) -> Vec<String> {
        let regex = SUBSTITUTION_REGEX.get_or_init(|| Regex::new(r"\$\{[^}]*\}").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Tag names, opening and closing, attributes ignored
    fn extract_tags(text: &str) -> Vec<String> {
        let regex =
            TAG_REGEX.get_or_init(|| Regex::new(r"<(/?)([A-Za-z][\w\-]*)[^<>]*?(/?)>").unwrap());

        regex
            .captures_iter(text)
            .map(|cap| format!("<{}{}{}>", &cap[1], &cap[2], &cap[3]))
            .collect()
    }
}
