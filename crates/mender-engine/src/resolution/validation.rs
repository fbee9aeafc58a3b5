use crate::driver::{DomDriver, ElementHandle, ElementInfo};
use crate::selector;
use mender_common::intent::ElementType;
use mender_common::protocol::Uniqueness;
use std::time::Duration;

/// Result of validating one candidate selector. Never an `Err`: every
/// failure mode is a value the resolver folds over.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Found(ElementHandle),
    NotFound(Miss),
    /// Malformed selector or driver failure for this candidate only.
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Miss {
    NoElements,
    Ambiguous(usize),
    Hidden,
    TimedOut,
    Incompatible(String),
}

impl ProbeOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn element(&self) -> Option<ElementHandle> {
        match self {
            Self::Found(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// Validate a candidate against the page: count check under `uniqueness`,
/// bounded visibility probe, then type compatibility.
pub async fn probe<D: DomDriver + ?Sized>(
    driver: &mut D,
    selector: &str,
    uniqueness: Uniqueness,
    element_type: ElementType,
    timeout: Duration,
) -> ProbeOutcome {
    let matches = match selector::locate(driver, selector).await {
        Ok(matches) => matches,
        Err(e) => return ProbeOutcome::Error(e.to_string()),
    };

    let target = match (uniqueness, matches.as_slice()) {
        (_, []) => return ProbeOutcome::NotFound(Miss::NoElements),
        (_, [only]) => *only,
        (Uniqueness::Exact, many) => return ProbeOutcome::NotFound(Miss::Ambiguous(many.len())),
        (Uniqueness::FirstVisible, many) => {
            match first_visible(driver, many, element_type, timeout).await {
                Some(outcome) => return outcome,
                None => return ProbeOutcome::NotFound(Miss::Hidden),
            }
        }
    };

    match visible_within(driver, target, timeout).await {
        Ok(true) => {}
        Ok(false) => return ProbeOutcome::NotFound(Miss::Hidden),
        Err(outcome) => return outcome,
    }

    check_type(driver, target, element_type).await
}

/// First element in document order that is visible and type-compatible.
async fn first_visible<D: DomDriver + ?Sized>(
    driver: &mut D,
    handles: &[ElementHandle],
    element_type: ElementType,
    timeout: Duration,
) -> Option<ProbeOutcome> {
    let mut last_miss = None;
    for &handle in handles {
        match visible_within(driver, handle, timeout).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(outcome) => {
                last_miss = Some(outcome);
                continue;
            }
        }
        match check_type(driver, handle, element_type).await {
            found @ ProbeOutcome::Found(_) => return Some(found),
            other => last_miss = Some(other),
        }
    }
    last_miss
}

async fn visible_within<D: DomDriver + ?Sized>(
    driver: &mut D,
    element: ElementHandle,
    timeout: Duration,
) -> Result<bool, ProbeOutcome> {
    // Drivers get the timeout too, but some ignore it; cap the wait here.
    let grace = timeout + Duration::from_millis(50);
    match tokio::time::timeout(grace, driver.is_visible(element, timeout)).await {
        Ok(Ok(visible)) => Ok(visible),
        Ok(Err(e)) => Err(ProbeOutcome::Error(e.to_string())),
        Err(_) => Err(ProbeOutcome::NotFound(Miss::TimedOut)),
    }
}

async fn check_type<D: DomDriver + ?Sized>(
    driver: &mut D,
    element: ElementHandle,
    element_type: ElementType,
) -> ProbeOutcome {
    if element_type == ElementType::Any {
        return ProbeOutcome::Found(element);
    }
    match driver.describe(element).await {
        Ok(info) if is_type_compatible(&info, element_type) => ProbeOutcome::Found(element),
        Ok(info) => ProbeOutcome::NotFound(Miss::Incompatible(format!(
            "<{}> is not a {}",
            info.tag, element_type
        ))),
        Err(e) => ProbeOutcome::Error(e.to_string()),
    }
}

/// Whether an element can stand in for the requested element type.
pub fn is_type_compatible(info: &ElementInfo, element_type: ElementType) -> bool {
    let role_in = |roles: &[&str]| {
        info.attr("role")
            .is_some_and(|r| roles.iter().any(|x| r.eq_ignore_ascii_case(x)))
    };
    let input_type = info.input_type().unwrap_or_default();
    let tag = info.tag.as_str();

    match element_type {
        ElementType::Any => true,

        ElementType::Button => {
            tag == "button"
                || role_in(&["button"])
                || (tag == "input"
                    && matches!(input_type.as_str(), "submit" | "button" | "reset" | "image"))
        }

        ElementType::Input => {
            (tag == "input"
                && !matches!(
                    input_type.as_str(),
                    "hidden" | "submit" | "button" | "reset" | "image"
                ))
                || matches!(tag, "textarea" | "select")
                || info.attr_is("contenteditable", "true")
                || info.attr("contenteditable") == Some("")
                || role_in(&["textbox", "searchbox", "combobox", "checkbox", "radio", "switch", "listbox"])
        }

        ElementType::Link => (tag == "a" && info.attr("href").is_some()) || role_in(&["link"]),
    }
}
