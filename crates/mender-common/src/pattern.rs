//! Learned (context → selector) associations and the query shapes used to
//! look them up.

use crate::protocol::ActionKind;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

pub type PatternId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedPattern {
    pub action_kind: ActionKind,
    pub url_context: String,
    pub selector: String,
    pub success: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// The action's intent hint ("email", "login"), when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

impl LearnedPattern {
    pub fn new(
        action_kind: ActionKind,
        url_context: impl Into<String>,
        selector: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            action_kind,
            url_context: url_context.into(),
            selector: selector.into(),
            success,
            timestamp: now_millis(),
            intent: None,
        }
    }

    pub fn success(
        action_kind: ActionKind,
        url_context: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        Self::new(action_kind, url_context, selector, true)
    }

    pub fn with_intent(mut self, intent: Option<impl Into<String>>) -> Self {
        self.intent = intent.map(Into::into);
        self
    }
}

/// What the caller is looking for. `action_kind: None` matches every kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternQuery {
    pub action_kind: Option<ActionKind>,
    pub url_context: String,
    pub intent: Option<String>,
}

impl PatternQuery {
    pub fn new(action_kind: Option<ActionKind>, url_context: impl Into<String>) -> Self {
        Self {
            action_kind,
            url_context: url_context.into(),
            intent: None,
        }
    }

    pub fn with_intent(mut self, intent: Option<impl Into<String>>) -> Self {
        self.intent = intent.map(Into::into);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternFilter {
    pub success_only: bool,
    pub min_similarity: f64,
    /// Glob matched against the stored URL context.
    pub url_pattern: Option<String>,
}

impl PatternFilter {
    pub fn successful(min_similarity: f64) -> Self {
        Self {
            success_only: true,
            min_similarity,
            url_pattern: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPattern {
    pub id: PatternId,
    pub pattern: LearnedPattern,
    pub similarity: f64,
}

/// Reduce a page URL to the part that identifies "the same screen":
/// host (with port) and path, without scheme, query or fragment.
pub fn url_context(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some() => {
            let host = parsed.host_str().unwrap_or_default();
            let path = parsed.path().trim_end_matches('/');
            match parsed.port() {
                Some(port) => format!("{}:{}{}", host, port, path),
                None => format!("{}{}", host, path),
            }
        }
        _ => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_context_strips_scheme_query_and_fragment() {
        assert_eq!(
            url_context("https://shop.example.com/login/?next=/cart#top"),
            "shop.example.com/login"
        );
    }

    #[test]
    fn test_url_context_keeps_port() {
        assert_eq!(url_context("http://localhost:8080/app"), "localhost:8080/app");
    }

    #[test]
    fn test_url_context_non_url_input() {
        assert_eq!(url_context("about:blank"), "about:blank");
        assert_eq!(url_context("fixtures/login.html?x=1"), "fixtures/login.html");
    }

    #[test]
    fn test_success_pattern_is_stamped() {
        let p = LearnedPattern::success(ActionKind::Click, "example.com", "#go")
            .with_intent(Some("login"));
        assert!(p.success);
        assert!(p.timestamp > 0);
        assert_eq!(p.intent.as_deref(), Some("login"));
    }
}
