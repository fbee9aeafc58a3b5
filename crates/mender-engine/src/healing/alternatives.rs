//! Alternative selectors for a broken one.

use crate::resolution::hints;
use crate::selector;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

lazy_static! {
    static ref CHILD_COMBINATOR: Regex = Regex::new(r"\s*>\s*").expect("valid regex");
    static ref NTH: Regex =
        Regex::new(r":nth-(?:last-)?(?:child|of-type)\([^)]*\)").expect("valid regex");
    static ref CLASS_CHAIN: Regex =
        Regex::new(r"((?:\.-?[_A-Za-z][\w-]*){2,})").expect("valid regex");
    static ref CLASS: Regex = Regex::new(r"\.-?[_A-Za-z][\w-]*").expect("valid regex");
    static ref ID: Regex = Regex::new(r"#(-?[_A-Za-z][\w-]*)").expect("valid regex");
}

/// Mechanical loosenings of `original`, most conservative first.
pub fn relaxations(original: &str) -> Vec<String> {
    let original = original.trim();
    let descendant = CHILD_COMBINATOR.replace_all(original, " ").into_owned();
    let no_nth = NTH.replace_all(original, "").into_owned();
    let both = NTH.replace_all(&descendant, "").into_owned();

    let mut out = vec![descendant, no_nth, both.clone()];
    for keep in [2, 1] {
        out.push(reduce_classes(original, keep));
        out.push(reduce_classes(&both, keep));
    }
    if let Some(caps) = ID.captures(original) {
        out.push(format!("#{}", &caps[1]));
    }

    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Keep the first `keep` classes of every class chain.
fn reduce_classes(selector: &str, keep: usize) -> String {
    CLASS_CHAIN
        .replace_all(selector, |caps: &regex::Captures<'_>| {
            CLASS
                .find_iter(&caps[1])
                .take(keep)
                .map(|m| m.as_str())
                .collect::<String>()
        })
        .into_owned()
}

/// The ordered, de-duplicated alternatives list: learned selectors, then
/// relaxations, then synonyms for the intent. Never contains `original`
/// and never contains a selector that fails to parse.
pub fn build(original: &str, learned: &[String], intent: Option<&str>, max: usize) -> Vec<String> {
    let original = original.trim();
    let synonyms = intent.map(hints::synonyms).unwrap_or_default();

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(original.to_string());

    let mut out = Vec::new();
    for candidate in learned
        .iter()
        .cloned()
        .chain(relaxations(original))
        .chain(synonyms)
    {
        let candidate = candidate.trim().to_string();
        if !seen.insert(candidate.clone()) {
            continue;
        }
        if let Err(e) = selector::validate(&candidate) {
            debug!("Dropping alternative '{}': {}", candidate, e);
            continue;
        }
        out.push(candidate);
        if out.len() >= max {
            break;
        }
    }
    out
}
