//! Static-document driver over parsed HTML.
//!
//! Handles are element ordinals in document order, so they stay stable across
//! re-parses of the same source. Actions never mutate the markup; filled
//! values and checked state live in side tables the caller can inspect.

use super::{DomDriver, DriverError, ElementHandle, ElementInfo};
use async_trait::async_trait;
use mender_common::protocol::ActionKind;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "meta", "title", "link", "noscript",
];

const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "checkbox", "radio", "submit", "button", "reset", "hidden", "file", "image", "range", "color",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub element: ElementHandle,
    pub kind: ActionKind,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HtmlDriver {
    source: String,
    url: String,
    values: HashMap<ElementHandle, String>,
    checked: HashSet<ElementHandle>,
    actions: Vec<ActionRecord>,
}

impl HtmlDriver {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            source: html.into(),
            url: "about:blank".to_string(),
            values: HashMap::new(),
            checked: HashSet::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub async fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let html = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(html).with_url(format!("file://{}", path.display())))
    }

    /// Replace the page. Handles issued for the previous markup are void.
    pub fn set_html(&mut self, html: impl Into<String>) {
        self.source = html.into();
        self.values.clear();
        self.checked.clear();
        self.actions.clear();
    }

    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    pub fn value_of(&self, element: ElementHandle) -> Option<&str> {
        self.values.get(&element).map(String::as_str)
    }

    pub fn is_checked(&self, element: ElementHandle) -> bool {
        self.checked.contains(&element)
    }

    fn with_document<T>(&self, f: impl FnOnce(&Html, &[ElementRef<'_>]) -> T) -> T {
        let html = Html::parse_document(&self.source);
        let elements: Vec<ElementRef<'_>> = html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        f(&html, &elements)
    }
}

fn handle_of(elements: &[ElementRef<'_>], el: &ElementRef<'_>) -> Option<ElementHandle> {
    elements
        .iter()
        .position(|e| e.id() == el.id())
        .map(|i| ElementHandle(i as u32))
}

fn element_at<'a>(
    elements: &[ElementRef<'a>],
    handle: ElementHandle,
) -> Result<ElementRef<'a>, DriverError> {
    elements
        .get(handle.0 as usize)
        .copied()
        .ok_or(DriverError::StaleElement(handle.0))
}

fn hides(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    if NON_RENDERED_TAGS.contains(&value.name()) || value.attr("hidden").is_some() {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

fn is_rendered(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    if value.name() == "input"
        && value
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return false;
    }
    std::iter::once(*el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .all(|e| !hides(&e))
}

fn normalized_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn check_actionable(
    el: &ElementRef<'_>,
    kind: ActionKind,
    value: Option<&str>,
) -> Result<(), DriverError> {
    let element = el.value();
    let tag = element.name();
    let input_type = element.attr("type").unwrap_or("text").to_lowercase();

    if !is_rendered(el) {
        return Err(DriverError::ActionFailed("element is not visible".into()));
    }
    if element.attr("disabled").is_some()
        && matches!(tag, "button" | "input" | "select" | "textarea" | "option")
    {
        return Err(DriverError::ActionFailed("element is disabled".into()));
    }

    match kind {
        ActionKind::Click => Ok(()),
        ActionKind::Fill => {
            let editable = (tag == "input" && !NON_TEXT_INPUT_TYPES.contains(&input_type.as_str()))
                || tag == "textarea"
                || element
                    .attr("contenteditable")
                    .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true"));
            if !editable {
                return Err(DriverError::ActionFailed(format!(
                    "<{}> is not fillable",
                    tag
                )));
            }
            if element.attr("readonly").is_some() {
                return Err(DriverError::ActionFailed("element is read-only".into()));
            }
            Ok(())
        }
        ActionKind::Select => {
            if tag != "select" {
                return Err(DriverError::ActionFailed(format!(
                    "<{}> is not a select",
                    tag
                )));
            }
            let wanted = value.unwrap_or_default();
            let has_option = el
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|o| o.value().name() == "option")
                .any(|o| o.value().attr("value") == Some(wanted) || normalized_text(&o) == wanted);
            if has_option {
                Ok(())
            } else {
                Err(DriverError::ActionFailed(format!("no option '{}'", wanted)))
            }
        }
        ActionKind::Check => {
            let checkable = (tag == "input" && matches!(input_type.as_str(), "checkbox" | "radio"))
                || element.attr("role").is_some_and(|r| {
                    matches!(r.to_lowercase().as_str(), "checkbox" | "radio" | "switch")
                });
            if checkable {
                Ok(())
            } else {
                Err(DriverError::ActionFailed(format!(
                    "<{}> is not checkable",
                    tag
                )))
            }
        }
    }
}

#[async_trait]
impl DomDriver for HtmlDriver {
    async fn query(&mut self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        let parsed = Selector::parse(selector)
            .map_err(|e| DriverError::InvalidSelector(format!("{}: {:?}", selector, e)))?;

        Ok(self.with_document(|html, elements| {
            html.select(&parsed)
                .filter_map(|el| handle_of(elements, &el))
                .collect()
        }))
    }

    async fn is_visible(
        &mut self,
        element: ElementHandle,
        _timeout: Duration,
    ) -> Result<bool, DriverError> {
        self.with_document(|_, elements| element_at(elements, element).map(|el| is_rendered(&el)))
    }

    async fn act(
        &mut self,
        element: ElementHandle,
        kind: ActionKind,
        value: Option<&str>,
    ) -> Result<(), DriverError> {
        self.with_document(|_, elements| {
            let el = element_at(elements, element)?;
            check_actionable(&el, kind, value)
        })?;

        match kind {
            ActionKind::Fill | ActionKind::Select => {
                self.values
                    .insert(element, value.unwrap_or_default().to_string());
            }
            ActionKind::Check => {
                self.checked.insert(element);
            }
            ActionKind::Click => {}
        }

        self.actions.push(ActionRecord {
            element,
            kind,
            value: value.map(str::to_string),
        });
        Ok(())
    }

    async fn describe(&mut self, element: ElementHandle) -> Result<ElementInfo, DriverError> {
        self.with_document(|_, elements| {
            let el = element_at(elements, element)?;
            let tag = el.value().name().to_string();
            let attributes: BTreeMap<String, String> = el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let parent = el
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|p| handle_of(elements, &p));
            let nth_of_type = el
                .prev_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|s| s.value().name() == tag)
                .count()
                + 1;

            Ok(ElementInfo {
                handle: element,
                text: normalized_text(&el),
                tag,
                attributes,
                parent,
                nth_of_type,
            })
        })
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.url.clone())
    }
}
