//! Semantic description of a wanted element.
//!
//! An `Intent` never carries a concrete selector. Strategies turn it into
//! candidate selectors; the resolver validates those against the live page.

use crate::error::ParseError;
use crate::protocol::ActionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse element category used for type compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Button,
    Input,
    Link,
    #[default]
    Any,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Input => "input",
            Self::Link => "link",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "button" => Ok(Self::Button),
            "input" => Ok(Self::Input),
            "link" => Ok(Self::Link),
            "any" | "" => Ok(Self::Any),
            other => Err(ParseError::UnknownElementType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default, alias = "type")]
    pub element_type: ElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl Intent {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            ..Default::default()
        }
    }

    pub fn button() -> Self {
        Self::new(ElementType::Button)
    }

    pub fn input() -> Self {
        Self::new(ElementType::Input)
    }

    pub fn link() -> Self {
        Self::new(ElementType::Link)
    }

    pub fn any() -> Self {
        Self::new(ElementType::Any)
    }

    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Derive an intent from a healing action's kind and free-form hint.
    ///
    /// Typing actions target inputs; clicks may land on buttons or links, so
    /// they stay untyped and lean on the hint as visible text.
    pub fn for_action(kind: ActionKind, hint: Option<&str>) -> Self {
        let hint = hint.map(str::trim).filter(|h| !h.is_empty());
        let element_type = match kind {
            ActionKind::Fill | ActionKind::Select | ActionKind::Check => ElementType::Input,
            ActionKind::Click => ElementType::Any,
        };

        Self {
            element_type,
            purpose: hint.map(str::to_string),
            text: match kind {
                ActionKind::Click => hint.map(str::to_string),
                _ => None,
            },
            aria_label: None,
            placeholder: None,
        }
    }

    /// Non-empty hint strings in trust order: purpose, aria-label, placeholder, text.
    pub fn hints(&self) -> Vec<&str> {
        [&self.purpose, &self.aria_label, &self.placeholder, &self.text]
            .into_iter()
            .filter_map(|h| h.as_deref())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .collect()
    }

    pub fn has_hints(&self) -> bool {
        !self.hints().is_empty()
    }
}
