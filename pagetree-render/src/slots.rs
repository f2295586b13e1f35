//! Check that template text references the blocks its view declares.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

// Comments match the first branch and carry no capture, so calls inside
// them are skipped.
static BLOCK_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)\{#.*?#\}|\bblock\(\s*["']([^"']+)["']"#).expect("valid regex")
});

/// Block names referenced via `block("name", ...)` in `text`, outside
/// `{# ... #}` comments.
pub fn referenced(text: &str) -> BTreeSet<&str> {
    BLOCK_CALL
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Declared block names that `text` never references, in the order given.
pub fn missing<'a>(text: &str, declared: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let found = referenced(text);
    declared
        .into_iter()
        .filter(|name| !found.contains(name))
        .collect()
}
