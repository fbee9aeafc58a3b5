//! The strategy catalog: seven ways of turning an intent into candidate
//! selectors, from most to least trusted.

use super::context::DomContext;
use super::hints;
use crate::selector::{attr_selector, has_text, id_selector, quote};
use mender_common::intent::{ElementType, Intent};
use mender_common::protocol::{Candidate, Provenance, Uniqueness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    SemanticId,
    NameAttribute,
    AriaLabel,
    LearnedPattern,
    TextContent,
    Positional,
    FuzzyMatch,
}

/// Data attributes that test suites put on elements on purpose.
pub const TEST_ATTRIBUTES: &[&str] = &["data-testid", "data-test", "data-cy", "data-qa"];

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::SemanticId,
        Strategy::NameAttribute,
        Strategy::AriaLabel,
        Strategy::LearnedPattern,
        Strategy::TextContent,
        Strategy::Positional,
        Strategy::FuzzyMatch,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Fixed rank, 1 = most specific.
    pub fn priority(&self) -> u8 {
        match self {
            Self::SemanticId => 1,
            Self::NameAttribute => 2,
            Self::AriaLabel => 3,
            Self::LearnedPattern => 4,
            Self::TextContent => 5,
            Self::Positional => 6,
            Self::FuzzyMatch => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SemanticId => "SemanticID",
            Self::NameAttribute => "NameAttribute",
            Self::AriaLabel => "AriaLabel",
            Self::LearnedPattern => "LearnedPattern",
            Self::TextContent => "TextContent",
            Self::Positional => "Positional",
            Self::FuzzyMatch => "FuzzyMatch",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Self::LearnedPattern => Provenance::Learned,
            Self::AriaLabel | Self::Positional => Provenance::Discovered,
            _ => Provenance::Hint,
        }
    }

    /// Positional is the one strategy that picks among several matches.
    pub fn uniqueness(&self) -> Uniqueness {
        match self {
            Self::Positional => Uniqueness::FirstVisible,
            _ => Uniqueness::Exact,
        }
    }

    pub fn confidence(&self) -> f64 {
        confidence(self.priority(), Self::COUNT)
    }

    /// Candidate selectors for `intent`, in the order they should be tried.
    /// Pure: reads only its arguments.
    pub fn generate(&self, intent: &Intent, ctx: &DomContext) -> Vec<Candidate> {
        let selectors = match self {
            Self::SemanticId => semantic_id(intent),
            Self::NameAttribute => name_attribute(intent),
            Self::AriaLabel => aria_label(intent, ctx),
            Self::LearnedPattern => ctx.learned.iter().map(|p| p.selector.clone()).collect(),
            Self::TextContent => text_content(intent),
            Self::Positional => positional(intent.element_type),
            Self::FuzzyMatch => fuzzy(intent),
        };

        let mut seen = std::collections::HashSet::new();
        selectors
            .into_iter()
            .filter(|s| !s.trim().is_empty() && seen.insert(s.clone()))
            .map(|selector| Candidate {
                selector,
                strategy_name: self.name().to_string(),
                priority: self.priority(),
                provenance: self.provenance(),
                uniqueness: self.uniqueness(),
            })
            .collect()
    }
}

/// `1 - rank / count`, with rank counted from zero so the first strategy
/// scores 1.0. Non-increasing in `priority`.
pub fn confidence(priority: u8, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let rank = priority.saturating_sub(1) as f64;
    (1.0 - rank / count as f64).clamp(0.0, 1.0)
}

/// An ordered, explicit list of strategies.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    strategies: Vec<Strategy>,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl StrategyCatalog {
    pub fn standard() -> Self {
        Self {
            strategies: Strategy::ALL.to_vec(),
        }
    }

    /// A subset of strategies. Order always follows priority, whatever the
    /// input order.
    pub fn new(mut strategies: Vec<Strategy>) -> Self {
        strategies.sort_by_key(|s| s.priority());
        strategies.dedup();
        Self { strategies }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn semantic_id(intent: &Intent) -> Vec<String> {
    intent
        .purpose
        .as_deref()
        .map(hints::semantic_ids)
        .unwrap_or_default()
}

/// Every attribute for one value before the next value, so a cap on the
/// candidate count drops the least likely spellings rather than whole
/// attribute kinds.
fn name_attribute(intent: &Intent) -> Vec<String> {
    let mut values = Vec::new();
    for hint in [&intent.purpose, &intent.aria_label, &intent.placeholder]
        .into_iter()
        .flatten()
    {
        let raw = hint.trim();
        for v in [hints::canonical_key(raw), raw.to_string(), raw.to_lowercase()] {
            if !v.is_empty() && !values.contains(&v) {
                values.push(v);
            }
        }
    }

    let mut out = Vec::new();
    for v in &values {
        out.push(attr_selector("", "name", v));
        for attr in TEST_ATTRIBUTES {
            out.push(attr_selector("", attr, v));
        }
    }
    out
}

fn aria_label(intent: &Intent, ctx: &DomContext) -> Vec<String> {
    let texts: Vec<&str> = [&intent.aria_label, &intent.purpose, &intent.text]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut out = Vec::new();
    for text in &texts {
        out.push(format!("[aria-label={} i]", quote(text)));
    }
    for text in &texts {
        for label in ctx.labels_matching(text) {
            if let Some(for_id) = &label.for_id {
                out.push(id_selector(for_id));
            }
            if let Some(id) = &label.id {
                out.push(format!("[aria-labelledby~={}]", quote(id)));
            }
        }
    }
    if let Some(placeholder) = intent.placeholder.as_deref().map(str::trim)
        && !placeholder.is_empty()
    {
        out.push(format!("[placeholder={} i]", quote(placeholder)));
    }
    out
}

fn text_content(intent: &Intent) -> Vec<String> {
    let texts: Vec<&str> = [&intent.text, &intent.purpose]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut out = Vec::new();
    for text in texts {
        let value = format!("[value={} i]", quote(text));
        match intent.element_type {
            ElementType::Button => {
                out.push(has_text("button", text));
                out.push(has_text(r#"[role="button"]"#, text));
                out.push(format!(r#"input[type="submit"]{}"#, value));
                out.push(format!(r#"input[type="button"]{}"#, value));
            }
            ElementType::Link => {
                out.push(has_text("a", text));
                out.push(has_text(r#"[role="link"]"#, text));
            }
            ElementType::Any => {
                out.push(has_text("button", text));
                out.push(has_text("a", text));
                out.push(has_text(r#"[role="button"]"#, text));
                out.push(format!(r#"input[type="submit"]{}"#, value));
            }
            ElementType::Input => {}
        }
    }
    out
}

fn positional(element_type: ElementType) -> Vec<String> {
    let selectors: &[&str] = match element_type {
        ElementType::Button => &["button", r#"input[type="submit"]"#, r#"[role="button"]"#],
        ElementType::Input => &[
            r#"input:not([type="hidden"]):not([type="submit"]):not([type="button"]):not([type="reset"])"#,
            "textarea",
            "select",
        ],
        ElementType::Link => &["a[href]"],
        ElementType::Any => &[],
    };
    selectors.iter().map(|s| s.to_string()).collect()
}

fn fuzzy(intent: &Intent) -> Vec<String> {
    let tag = match intent.element_type {
        ElementType::Button => "button",
        ElementType::Input => "input",
        ElementType::Link => "a",
        ElementType::Any => "",
    };

    let mut words = Vec::new();
    for hint in intent.hints() {
        for word in hints::keywords(hint) {
            if !words.contains(&word) {
                words.push(word);
            }
        }
    }

    let mut out = Vec::new();
    for word in &words {
        let q = quote(word);
        out.push(format!("{}[id*={} i]", tag, q));
        out.push(format!("{}[name*={} i]", tag, q));
        out.push(format!("{}[class*={} i]", tag, q));
        if matches!(intent.element_type, ElementType::Input | ElementType::Any) {
            out.push(format!("{}[placeholder*={} i]", tag, q));
        }
        out.push(format!("{}[aria-label*={} i]", tag, q));
    }
    if intent.element_type != ElementType::Input
        && let Some(text) = intent.text.as_deref().map(str::trim)
        && !text.is_empty()
    {
        let tag = if tag.is_empty() { "*" } else { tag };
        out.push(has_text(tag, text));
    }
    out
}
