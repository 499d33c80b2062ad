//! Shared helpers for handler and filename modules: static pattern compilation.

use regex::Regex;
use scraper::Selector;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Parses a CSS selector at static init; panics on invalid selector.
pub(crate) fn compile_static_selector(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_static_regex_valid_pattern() {
        let re = compile_static_regex(r"^\d+$");
        assert!(re.is_match("123"));
    }

    #[test]
    #[should_panic(expected = "invalid static regex")]
    fn test_compile_static_regex_panics_on_invalid_pattern() {
        let _ = compile_static_regex("(unclosed");
    }

    #[test]
    #[should_panic(expected = "invalid static selector")]
    fn test_compile_static_selector_panics_on_invalid_selector() {
        let _ = compile_static_selector("a[");
    }
}
