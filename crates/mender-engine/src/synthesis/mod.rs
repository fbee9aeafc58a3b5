//! Selector synthesis: the inverse of resolution. Given an element found by
//! any means, produce a selector that will find it again.

pub mod stability;

use crate::driver::{DomDriver, DriverError, ElementHandle, ElementInfo};
use crate::selector::{self, attr_selector, id_selector};
use stability::{STABLE_DATA_ATTRIBUTES, is_dynamic_id, is_stable_class, is_stable_data_attr};
use std::collections::HashSet;
use tracing::debug;

/// Upper bound on the ancestor walk. Cycles are cut separately.
const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorSynthesizer;

impl SelectorSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// A selector that matches exactly `element`, preferring stable
    /// attributes. Only fails when the element itself cannot be described.
    pub async fn synthesize<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        element: ElementHandle,
    ) -> Result<String, DriverError> {
        let info = driver.describe(element).await?;

        for candidate in candidates(&info) {
            if unique_match(driver, &candidate, element).await {
                debug!(element = %element, selector = %candidate, "Synthesized selector");
                return Ok(candidate);
            }
        }

        let path = ancestor_path(driver, &info).await;
        debug!(element = %element, selector = %path, "Fell back to ancestor path");
        Ok(path)
    }
}

/// Attribute-based candidates, most stable first.
pub fn candidates(info: &ElementInfo) -> Vec<String> {
    let tag = info.tag.as_str();
    let mut out = Vec::new();

    if let Some(id) = info.id()
        && !is_dynamic_id(id)
    {
        out.push(id_selector(id));
    }

    if let Some(name) = non_blank(info.attr("name")) {
        out.push(attr_selector(tag, "name", name));
    }

    for attr in STABLE_DATA_ATTRIBUTES {
        if let Some(value) = non_blank(info.attr(attr)) {
            out.push(attr_selector("", attr, value));
        }
    }
    for (name, value) in &info.attributes {
        if !STABLE_DATA_ATTRIBUTES.contains(&name.as_str()) && is_stable_data_attr(name, value) {
            out.push(attr_selector(tag, name, value));
        }
    }

    if let Some(label) = non_blank(info.attr("aria-label")) {
        out.push(attr_selector(tag, "aria-label", label));
    }

    let classes: Vec<&str> = info
        .classes()
        .into_iter()
        .filter(|c| is_stable_class(c))
        .take(3)
        .collect();
    for n in 1..=classes.len() {
        out.push(format!("{}.{}", tag, classes[..n].join(".")));
    }

    out.extend(semantic(info));
    out
}

/// `tag[type]` (+ placeholder / value) for form controls, `a[href]` for links.
fn semantic(info: &ElementInfo) -> Vec<String> {
    let tag = info.tag.as_str();
    let mut out = Vec::new();
    match tag {
        "input" | "button" | "textarea" | "select" => {
            let base = match info.attr("type").map(str::trim).filter(|t| !t.is_empty()) {
                Some(t) => attr_selector(tag, "type", &t.to_lowercase()),
                None => tag.to_string(),
            };
            if tag != "textarea" && tag != "select" {
                out.push(base.clone());
            }
            if let Some(p) = non_blank(info.attr("placeholder")) {
                out.push(format!("{}{}", base, attr_selector("", "placeholder", p)));
            }
            if let Some(v) = non_blank(info.attr("value")) {
                out.push(format!("{}{}", base, attr_selector("", "value", v)));
            }
        }
        "a" => {
            if let Some(href) = non_blank(info.attr("href"))
                && !href.starts_with("javascript:")
            {
                out.push(attr_selector("a", "href", href));
            }
        }
        _ => {}
    }
    out
}

/// Syntactically valid and resolves to exactly `element`.
async fn unique_match<D: DomDriver + ?Sized>(
    driver: &mut D,
    candidate: &str,
    element: ElementHandle,
) -> bool {
    if selector::validate(candidate).is_err() {
        return false;
    }
    matches!(driver.query(candidate).await.as_deref(), Ok([only]) if *only == element)
}

/// `#anchor > … > tag:nth-of-type(k)`, or rooted at `body` when no ancestor
/// has a stable id unique on the page. A walk that never reaches `body`
/// joins the root with a descendant combinator instead.
async fn ancestor_path<D: DomDriver + ?Sized>(driver: &mut D, info: &ElementInfo) -> String {
    if matches!(info.tag.as_str(), "html" | "body") {
        return info.tag.clone();
    }

    let mut segments = vec![segment(info)];
    let mut anchor = None;
    let mut rooted = false;
    let mut seen = HashSet::from([info.handle]);
    let mut parent = info.parent;

    for _ in 0..MAX_DEPTH {
        let Some(handle) = parent else { break };
        if !seen.insert(handle) {
            break;
        }
        let Ok(ancestor) = driver.describe(handle).await else {
            break;
        };
        if matches!(ancestor.tag.as_str(), "body" | "html") {
            rooted = true;
            break;
        }
        if let Some(id) = ancestor.id()
            && !is_dynamic_id(id)
            && unique_match(driver, &id_selector(id), handle).await
        {
            anchor = Some(id_selector(id));
            break;
        }
        segments.push(segment(&ancestor));
        parent = ancestor.parent;
    }

    segments.reverse();
    let path = segments.join(" > ");
    match anchor {
        Some(anchor) => format!("{} > {}", anchor, path),
        None if rooted => format!("body > {}", path),
        None => format!("body {}", path),
    }
}

fn segment(info: &ElementInfo) -> String {
    format!("{}:nth-of-type({})", info.tag, info.nth_of_type.max(1))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
