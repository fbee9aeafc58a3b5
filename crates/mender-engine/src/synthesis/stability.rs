//! Heuristics for telling hand-written identifiers from generated ones.

use crate::selector::is_css_identifier;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref UUID: Regex =
        Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}").expect("valid regex");
    static ref HEX_RUN: Regex = Regex::new(r"(?i)[0-9a-f]{8,}").expect("valid regex");
    static ref DIGIT_RUN: Regex = Regex::new(r"\d{4,}").expect("valid regex");
    static ref FRAMEWORK_ID: Regex =
        Regex::new(r"^(?::r[0-9a-z]+:|ember\d+|mui-\d+|react-select-\d+.*|headlessui-.*)$")
            .expect("valid regex");
    static ref CSS_IN_JS: Regex =
        Regex::new(r"^(?:sc-[A-Za-z]+|css-[a-z0-9]+(?:-\w+)?|jsx-\d+|emotion-\d+|svelte-[a-z0-9]+)$")
            .expect("valid regex");
}

const STATE_PREFIXES: &[&str] = &["is-", "has-", "js-"];

const STATE_SUFFIXES: &[&str] = &[
    "-active", "-selected", "-open", "-opened", "-closed", "-focused", "-focus", "-hover",
    "-disabled", "-checked", "-expanded", "-collapsed", "-visible", "-hidden", "-loading",
];

const STATE_NAMES: &[&str] = &[
    "active", "selected", "open", "focus", "focused", "hover", "disabled", "checked",
    "expanded", "collapsed", "hidden", "visible", "show", "loading", "current",
];

const GENERIC_NAMES: &[&str] = &[
    "container", "wrapper", "wrap", "row", "col", "column", "inner", "outer", "content", "main",
    "box", "item", "section", "clearfix", "flex", "grid", "block", "field", "group", "form-group",
    "form-control", "d-flex", "w-100", "mb-3", "mt-3",
];

/// Data attributes kept on elements for automation, most trusted first.
pub const STABLE_DATA_ATTRIBUTES: &[&str] = &[
    "data-testid",
    "data-test",
    "data-cy",
    "data-qa",
    "data-test-id",
    "data-automation-id",
];

/// Ids that look generated per render or per session.
pub fn is_dynamic_id(id: &str) -> bool {
    let lower = id.to_lowercase();
    ["temp", "tmp", "uid"].iter().any(|w| lower.contains(w))
        || UUID.is_match(id)
        || HEX_RUN
            .find_iter(id)
            .any(|m| m.as_str().chars().any(|c| c.is_ascii_digit()))
        || DIGIT_RUN.is_match(id)
        || FRAMEWORK_ID.is_match(&lower)
}

/// Hashed class names from CSS modules or CSS-in-JS.
pub fn is_dynamic_class(class: &str) -> bool {
    class.rsplit('_').next().is_some_and(|suffix| suffix != class && looks_hashed(suffix))
        || CSS_IN_JS.is_match(class)
        || DIGIT_RUN.is_match(class)
        || HEX_RUN
            .find_iter(class)
            .any(|m| m.as_str().chars().any(|c| c.is_ascii_digit()))
}

/// Five or more alphanumerics mixing letters and digits, as in `a1b2c`.
fn looks_hashed(s: &str) -> bool {
    s.len() >= 5
        && s.chars().all(|c| c.is_ascii_alphanumeric())
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars().any(|c| c.is_ascii_alphabetic())
}

pub fn is_state_class(class: &str) -> bool {
    let lower = class.to_lowercase();
    STATE_NAMES.contains(&lower.as_str())
        || STATE_PREFIXES.iter().any(|p| lower.starts_with(p))
        || STATE_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

pub fn is_generic_class(class: &str) -> bool {
    let lower = class.to_lowercase();
    GENERIC_NAMES.contains(&lower.as_str())
        || lower.starts_with("col-")
        || lower.len() < 2
}

pub fn is_stable_class(class: &str) -> bool {
    is_css_identifier(class)
        && !is_dynamic_class(class)
        && !is_state_class(class)
        && !is_generic_class(class)
}

/// Any `data-*` attribute worth anchoring on, outside the allowlist.
pub fn is_stable_data_attr(name: &str, value: &str) -> bool {
    name.starts_with("data-")
        && !name.starts_with("data-v-")
        && !matches!(name, "data-reactid" | "data-react-checksum" | "data-state")
        && !value.trim().is_empty()
        && value.len() <= 64
        && !is_dynamic_id(value)
}
