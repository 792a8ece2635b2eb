//! Decides whether a candidate string is user-facing text worth translating.
//!
//! A candidate must pass every check in [`is_translatable_text`]; anything that
//! looks like code, a path, an identifier or a technical token is rejected.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Minimum trimmed length, in characters
pub const MIN_TEXT_LENGTH: usize = 2;

/// Minimum share of alphabetic characters
const MIN_ALPHA_RATIO: f64 = 0.3;

/// Whitespace-free candidates shorter than this are checked for identifier shapes
const IDENTIFIER_SHAPE_MAX_LEN: usize = 30;

static EXCLUDE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static IDENTIFIER_SHAPES: OnceLock<Vec<Regex>> = OnceLock::new();
static TECHNICAL_TERMS: OnceLock<HashSet<&'static str>> = OnceLock::new();

fn exclude_patterns() -> &'static [Regex] {
    EXCLUDE_PATTERNS.get_or_init(|| {
        [
            // URLs
            r"^(?i)(https?|ftp|wss?|file)://",
            r"^(?i)(www\.|mailto:|tel:|data:)",
            // absolute and relative file paths
            r"^\.{0,2}/[\w@.\-/]*$",
            r"^[A-Za-z]:\\",
            // import-style paths
            r"^@[\w\-]*/[\w.\-/]+$",
            r"^~/",
            r"^[\w\-]+(/[\w.\-]+)+$",
            // ALL-CAPS constants
            r"^[A-Z][A-Z0-9_]*$",
            // version numbers
            r"^[v^~]?\d+(\.\d+)+([\-+][\w.]+)?$",
            // base64-looking tokens
            r"^[A-Za-z0-9+/]{20,}={0,2}$",
            // hex colors
            r"^#([0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$",
            // CSS functions, variables and units
            r"^(?i)(rgba?|hsla?|calc|var|url|attr|linear-gradient|radial-gradient|translate[xyz3d]*|rotate[xyz]?|scale[xyz]?|cubic-bezier)\(",
            r"^--[\w\-]+$",
            r"^-?\d+(\.\d+)?(px|em|rem|vh|vw|vmin|vmax|pt|ms|s|deg|fr)$",
            // console-method-like strings
            r"^console\.\w+",
            // key:value tokens
            r"^[\w\-]+:[\w\-]+$",
            // PascalCaseError names
            r"^[A-Z][A-Za-z]*Error$",
            // kebab-case package-like tokens
            r"^[a-z0-9]+(-[a-z0-9]+)+$",
            // query-like tokens
            r"^\?[\w=&\-]*",
            // bare function calls
            r"^[\w$.]+\([^)]*\);?$",
            // bare property access
            r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)+$",
            // filenames with known extensions
            r"^[\w.\-]+\.(?i)(js|mjs|cjs|ts|jsx|tsx|vue|css|scss|sass|less|json|html?|png|jpe?g|gif|svg|ico|webp|bmp|woff2?|ttf|eot|otf|md|txt|map|ya?ml|xml|exe|dmg|zip|node)$",
            // raw interpolation syntax
            r"^\{\{.*\}\}$",
            r"\$\{",
            // directive-prefixed tokens
            r"^(v-[\w\-]+|[@:#][\w.\-:]+)$",
            // camelCase identifiers
            r"^[a-z][a-z0-9]*([A-Z][a-z0-9]*)+$",
            // PascalCase words with more than one hump
            r"^[A-Z][a-z0-9]+([A-Z][a-z0-9]*)+$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn identifier_shapes() -> &'static [Regex] {
    IDENTIFIER_SHAPES.get_or_init(|| {
        [
            // camelCase
            r"^[a-z]+[A-Z][A-Za-z0-9]*$",
            // PascalCase
            r"^[A-Z][a-z0-9]+[A-Z][A-Za-z0-9]*$",
            // kebab-case
            r"^[A-Za-z0-9]+(-[A-Za-z0-9]+)+$",
            // snake_case
            r"^[A-Za-z0-9]+(_[A-Za-z0-9]+)+$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn technical_terms() -> &'static HashSet<&'static str> {
    TECHNICAL_TERMS.get_or_init(|| {
        [
            // protocol and format acronyms
            "HTTP", "HTTPS", "API", "URL", "URI", "JSON", "XML", "HTML", "CSS", "SVG", "PNG",
            "JPG", "JPEG", "GIF", "PDF", "UTF-8", "utf-8", "utf8", "ASCII", "UUID", "JWT",
            "SQL", "REST", "TCP", "UDP", "DNS", "SSL", "TLS", "WebSocket", "GET", "POST", "PUT",
            "PATCH", "DELETE", "OPTIONS", "HEAD",
            // frameworks and tools
            "Vue", "React", "Angular", "Svelte", "Vite", "Webpack", "Rollup", "Electron",
            "Node", "Node.js", "npm", "yarn", "pnpm", "TypeScript", "JavaScript", "ESLint",
            "Prettier", "Babel", "Pinia", "Vuex", "Axios", "axios", "Tauri", "GitHub", "macOS",
            "Windows", "Linux", "iOS", "Android",
            // literal spellings
            "true", "false", "null", "undefined", "NaN", "Infinity", "True", "False", "None",
            "TRUE", "FALSE", "NULL",
            // common unit and format tokens
            "px", "em", "rem", "auto", "none", "inherit", "utf", "base64", "hex", "rgb", "rgba",
        ]
        .into_iter()
        .collect()
    })
}

/// Returns true when `text` looks like user-facing copy.
pub fn is_translatable_text(text: &str) -> bool {
    let trimmed = text.trim();
    let char_count = trimmed.chars().count();

    if char_count < MIN_TEXT_LENGTH {
        return false;
    }

    if !trimmed.chars().any(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    if exclude_patterns().iter().any(|re| re.is_match(trimmed)) {
        return false;
    }

    if technical_terms().contains(trimmed) {
        return false;
    }

    let alpha_count = trimmed.chars().filter(|c| c.is_alphabetic()).count();
    if (alpha_count as f64) / (char_count as f64) < MIN_ALPHA_RATIO {
        return false;
    }

    if !trimmed.chars().any(char::is_whitespace)
        && char_count < IDENTIFIER_SHAPE_MAX_LEN
        && identifier_shapes().iter().any(|re| re.is_match(trimmed))
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keeps_plain_sentence() {
        assert!(is_translatable_text("Hello World"));
        assert!(is_translatable_text("Save changes"));
        assert!(is_translatable_text("Are you sure you want to delete this file?"));
    }

    #[test]
    fn test_keeps_single_capitalized_word() {
        assert!(is_translatable_text("Save"));
        assert!(is_translatable_text("Cancel"));
        assert!(is_translatable_text("Settings"));
    }

    #[test]
    fn test_drops_camel_case_handler() {
        assert!(!is_translatable_text("onClick"));
        assert!(!is_translatable_text("handleSubmit"));
    }

    #[test]
    fn test_drops_too_short_and_letterless() {
        assert!(!is_translatable_text("a"));
        assert!(!is_translatable_text("  "));
        assert!(!is_translatable_text("123"));
        assert!(!is_translatable_text("--- !!"));
    }

    #[test]
    fn test_drops_urls_and_paths() {
        assert!(!is_translatable_text("https://example.com/docs"));
        assert!(!is_translatable_text("www.example.com"));
        assert!(!is_translatable_text("./components/Header.vue"));
        assert!(!is_translatable_text("../utils"));
        assert!(!is_translatable_text("/api/v1/users"));
        assert!(!is_translatable_text("@/components/Button"));
        assert!(!is_translatable_text("lodash/merge"));
    }

    #[test]
    fn test_drops_constants_and_versions() {
        assert!(!is_translatable_text("MAX_RETRIES"));
        assert!(!is_translatable_text("1.2.3"));
        assert!(!is_translatable_text("v2.0.0-beta.1"));
    }

    #[test]
    fn test_drops_css_tokens() {
        assert!(!is_translatable_text("#fff"));
        assert!(!is_translatable_text("#1a2b3c"));
        assert!(!is_translatable_text("rgba(0, 0, 0, 0.5)"));
        assert!(!is_translatable_text("var(--primary-color)"));
        assert!(!is_translatable_text("--primary-color"));
        assert!(!is_translatable_text("12px"));
    }

    #[test]
    fn test_drops_code_shaped_strings() {
        assert!(!is_translatable_text("console.log"));
        assert!(!is_translatable_text("update:modelValue"));
        assert!(!is_translatable_text("ValidationError"));
        assert!(!is_translatable_text("vue-router"));
        assert!(!is_translatable_text("?page=1&size=10"));
        assert!(!is_translatable_text("fetchData()"));
        assert!(!is_translatable_text("store.state.user"));
        assert!(!is_translatable_text("logo.png"));
        assert!(!is_translatable_text("{{ message }}"));
        assert!(!is_translatable_text("Hello ${name}"));
        assert!(!is_translatable_text("v-if"));
        assert!(!is_translatable_text("@click"));
        assert!(!is_translatable_text("UserProfile"));
        assert!(!is_translatable_text("user_name"));
    }

    #[test]
    fn test_drops_technical_terms() {
        assert!(!is_translatable_text("JSON"));
        assert!(!is_translatable_text("Electron"));
        assert!(!is_translatable_text("undefined"));
        assert!(!is_translatable_text("true"));
    }

    #[test]
    fn test_drops_low_alpha_ratio() {
        assert!(!is_translatable_text("a1234567"));
        assert!(!is_translatable_text("x = 1 + 2 + 3"));
    }

    #[test]
    fn test_trims_before_checking() {
        assert!(is_translatable_text("   Open file   "));
        assert!(!is_translatable_text("  onClick  "));
    }

    proptest! {
        #[test]
        fn prop_filter_is_deterministic(s in "\\PC{0,40}") {
            prop_assert_eq!(is_translatable_text(&s), is_translatable_text(&s));
        }

        #[test]
        fn prop_digits_only_never_translatable(s in "[0-9 .,:]{0,20}") {
            prop_assert!(!is_translatable_text(&s));
        }

        #[test]
        fn prop_camel_case_never_translatable(head in "[a-z]{1,8}", tail in "[A-Z][a-z]{1,8}") {
            let ident = format!("{}{}", head, tail);
            prop_assert!(!is_translatable_text(&ident));
        }
    }
}
