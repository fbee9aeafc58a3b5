use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy name reported when the caller's own selector worked.
pub const ORIGINAL_STRATEGY: &str = "Original";

/// Strategy name reported when a healing alternative worked.
pub const ALTERNATIVE_STRATEGY: &str = "Alternative";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Fill,
    Select,
    Check,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Fill => "fill",
            Self::Select => "select",
            Self::Check => "check",
        }
    }

    /// Whether the action needs a value to be meaningful.
    pub fn requires_value(&self) -> bool {
        matches!(self, Self::Fill | Self::Select)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "click" => Ok(Self::Click),
            "fill" | "type" => Ok(Self::Fill),
            "select" => Ok(Self::Select),
            "check" => Ok(Self::Check),
            other => Err(ParseError::UnknownActionKind(other.to_string())),
        }
    }
}

/// Where a candidate selector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Static hint tables and attribute templates.
    Hint,
    /// Derived from what is currently on the page.
    Discovered,
    /// Mined from the pattern store.
    Learned,
}

/// How many matched elements a candidate may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    /// Exactly one element; several is ambiguous and rejected.
    #[default]
    Exact,
    /// The first visible element in document order.
    FirstVisible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub selector: String,
    pub strategy_name: String,
    pub priority: u8,
    pub provenance: Provenance,
    #[serde(default)]
    pub uniqueness: Uniqueness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_name: Option<String>,
    pub confidence: f64,
    pub attempts: u32,
}

impl ResolutionResult {
    pub fn not_found(attempts: u32) -> Self {
        Self {
            found: false,
            selector: None,
            strategy_name: None,
            confidence: 0.0,
            attempts,
        }
    }

    pub fn found(candidate: &Candidate, confidence: f64, attempts: u32) -> Self {
        Self {
            found: true,
            selector: Some(candidate.selector.clone()),
            strategy_name: Some(candidate.strategy_name.clone()),
            confidence,
            attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingAction {
    pub action_kind: ActionKind,
    pub original_selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

impl HealingAction {
    pub fn new(action_kind: ActionKind, original_selector: impl Into<String>) -> Self {
        Self {
            action_kind,
            original_selector: original_selector.into(),
            value: None,
            intent: None,
        }
    }

    /// Build an action from loosely-typed caller input.
    pub fn parse(
        action_kind: &str,
        original_selector: impl Into<String>,
        value: Option<String>,
        intent: Option<String>,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            action_kind: action_kind.parse()?,
            original_selector: original_selector.into(),
            value,
            intent,
        })
    }

    pub fn click(selector: impl Into<String>) -> Self {
        Self::new(ActionKind::Click, selector)
    }

    pub fn fill(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionKind::Fill, selector).with_value(value)
    }

    pub fn select(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionKind::Select, selector).with_value(value)
    }

    pub fn check(selector: impl Into<String>) -> Self {
        Self::new(ActionKind::Check, selector)
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingResult {
    pub success: bool,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_name: Option<String>,
    pub duration_ms: u64,
    pub reflection_note: String,
}
