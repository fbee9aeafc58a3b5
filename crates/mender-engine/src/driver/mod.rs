pub mod html;

use async_trait::async_trait;
pub use mender_common::error::DriverError;
use mender_common::protocol::ActionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub use html::HtmlDriver;

/// Opaque element id assigned by a driver. Stable for the driver's lifetime
/// (or until the page navigates, for live backends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub u32);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Static facts about one element, as seen by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub handle: ElementHandle,
    /// Lowercase tag name.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Text content, trimmed.
    pub text: String,
    pub parent: Option<ElementHandle>,
    /// 1-based position among siblings with the same tag.
    pub nth_of_type: usize,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attr_is(&self, name: &str, value: &str) -> bool {
        self.attr(name).is_some_and(|v| v.eq_ignore_ascii_case(value))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.trim().is_empty())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Lowercased `type` attribute; inputs default to "text".
    pub fn input_type(&self) -> Option<String> {
        match (self.tag.as_str(), self.attr("type")) {
            (_, Some(t)) => Some(t.trim().to_lowercase()),
            ("input", None) => Some("text".to_string()),
            _ => None,
        }
    }
}

/// The narrow capability set the resolver, healer and synthesizer need from
/// an automation backend. One adapter per backend implements it.
#[async_trait]
pub trait DomDriver: Send + Sync {
    /// All elements matching a CSS selector, in document order.
    async fn query(&mut self, selector: &str) -> Result<Vec<ElementHandle>, DriverError>;

    /// Whether the element is attached and rendered, waiting up to `timeout`
    /// for it to become so.
    async fn is_visible(
        &mut self,
        element: ElementHandle,
        timeout: Duration,
    ) -> Result<bool, DriverError>;

    /// Perform an action. `value` carries the text for fill and the option
    /// for select.
    async fn act(
        &mut self,
        element: ElementHandle,
        kind: ActionKind,
        value: Option<&str>,
    ) -> Result<(), DriverError>;

    async fn describe(&mut self, element: ElementHandle) -> Result<ElementInfo, DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Evaluate a script in the page context.
    async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value, DriverError> {
        Err(DriverError::NotSupported("evaluate".into()))
    }
}
