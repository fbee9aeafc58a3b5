//! Selector dialect shared by candidates, healing alternatives and callers.
//!
//! A selector is plain CSS, optionally followed by one text filter in the
//! form `:has-text("…")`. The filter keeps elements whose normalized text
//! content contains the given string, case-insensitively.

use crate::driver::{DomDriver, DriverError, ElementHandle};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HAS_TEXT: Regex =
        Regex::new(r#":has-text\(\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')\s*\)\s*$"#)
            .expect("has-text pattern is valid");
    static ref CSS_IDENT: Regex =
        Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_-]*$").expect("identifier pattern is valid");
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSelector {
    pub css: String,
    pub has_text: Option<String>,
}

impl ParsedSelector {
    pub fn parse(selector: &str) -> Result<Self, DriverError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(DriverError::InvalidSelector("empty selector".into()));
        }

        let (css, has_text) = match HAS_TEXT.captures(selector) {
            Some(caps) => {
                let whole = caps.get(0).map(|m| m.start()).unwrap_or(selector.len());
                let raw = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                let prefix = &selector[..whole];
                let css = prefix.trim();
                let css = if css.is_empty() {
                    "*".to_string()
                } else if prefix.ends_with(char::is_whitespace) {
                    // `form :has-text(..)` filters descendants of `form`.
                    format!("{} *", css)
                } else {
                    css.to_string()
                };
                (css, Some(unescape(raw)))
            }
            None => (selector.to_string(), None),
        };

        scraper::Selector::parse(&css)
            .map_err(|e| DriverError::InvalidSelector(format!("{}: {:?}", selector, e)))?;

        Ok(Self { css, has_text })
    }
}

/// Check syntax without touching a page.
pub fn validate(selector: &str) -> Result<(), DriverError> {
    ParsedSelector::parse(selector).map(|_| ())
}

/// Query the page through the dialect: CSS first, then the text filter.
///
/// Elements that disappear between the query and the text read are dropped.
pub async fn locate<D: DomDriver + ?Sized>(
    driver: &mut D,
    selector: &str,
) -> Result<Vec<ElementHandle>, DriverError> {
    let parsed = ParsedSelector::parse(selector)?;
    let matches = driver.query(&parsed.css).await?;

    let Some(needle) = parsed.has_text.as_deref() else {
        return Ok(matches);
    };
    let needle = normalize_text(needle);

    let mut kept = Vec::with_capacity(matches.len());
    for handle in matches {
        if let Ok(info) = driver.describe(handle).await
            && normalize_text(&info.text).contains(&needle)
        {
            kept.push(handle);
        }
    }
    Ok(kept)
}

/// Lowercase, trim, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a string as a CSS string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' | '\r' => out.push(' '),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `#id` when the id is a plain identifier, else `[id="…"]`.
pub fn id_selector(id: &str) -> String {
    if is_css_identifier(id) {
        format!("#{}", id)
    } else {
        format!("[id={}]", quote(id))
    }
}

/// `tag[attr="value"]`, or `[attr="value"]` when `tag` is empty.
pub fn attr_selector(tag: &str, attr: &str, value: &str) -> String {
    format!("{}[{}={}]", tag, attr, quote(value))
}

pub fn has_text(css: &str, text: &str) -> String {
    format!("{}:has-text({})", css, quote(text))
}

pub fn is_css_identifier(s: &str) -> bool {
    CSS_IDENT.is_match(s) && !s.starts_with("--") && !s.starts_with("-0")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
