//! Self-healing action pipeline:
//! original selector → alternatives → resolver fallback → exhaustion.
//!
//! Every route that ends in a successful action feeds the pattern store, so
//! the next resolution sees the healed selector as a learned candidate.

use super::alternatives;
use crate::config::HealingConfig;
use crate::driver::{DomDriver, DriverError, ElementHandle};
use crate::metrics::Metrics;
use crate::resolution::ElementResolver;
use crate::selector;
use crate::store::{self, PatternStore};
use mender_common::error::ParseError;
use mender_common::intent::Intent;
use mender_common::pattern::{LearnedPattern, PatternFilter, PatternQuery, url_context};
use mender_common::protocol::{
    ALTERNATIVE_STRATEGY, ActionKind, HealingAction, HealingResult, ORIGINAL_STRATEGY,
};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Caller mistakes. Anything the page does wrong is a `HealingResult`.
#[derive(Debug, Error, PartialEq)]
pub enum HealError {
    #[error("Invalid action: {0}")]
    InvalidAction(#[from] ParseError),

    #[error("Action '{0}' requires a value")]
    MissingValue(ActionKind),

    #[error("Invalid original selector: {0}")]
    InvalidSelector(String),
}

/// How one attempt on one selector ended.
#[derive(Debug, Clone, PartialEq)]
enum AttemptOutcome {
    Done(ElementHandle),
    Missing,
    Failed(String),
}

impl AttemptOutcome {
    fn reason(&self) -> String {
        match self {
            Self::Done(_) => "ok".into(),
            Self::Missing => "no matching element".into(),
            Self::Failed(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HealingExecutor {
    config: HealingConfig,
}

impl HealingExecutor {
    pub fn new(config: HealingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealingConfig {
        &self.config
    }

    /// Check caller input before touching the page.
    pub fn validate(action: &HealingAction) -> Result<(), HealError> {
        if action.action_kind.requires_value() && action.value.is_none() {
            return Err(HealError::MissingValue(action.action_kind));
        }
        selector::validate(&action.original_selector).map_err(|e| match e {
            DriverError::InvalidSelector(msg) => HealError::InvalidSelector(msg),
            other => HealError::InvalidSelector(other.to_string()),
        })
    }

    pub async fn execute<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        resolver: &ElementResolver,
        store: &dyn PatternStore,
        action: &HealingAction,
        metrics: &mut Metrics,
    ) -> Result<HealingResult, HealError> {
        Self::validate(action)?;
        let started = Instant::now();
        metrics.heals += 1;

        let url = driver.current_url().await.unwrap_or_default();
        let url_ctx = url_context(&url);
        let original = action.original_selector.trim();

        // 1. Original selector
        let first = self.attempt(driver, original, action).await;
        debug!(selector = original, outcome = ?first, "Original attempt");
        if let AttemptOutcome::Done(_) = first {
            metrics.original_successes += 1;
            metrics.record_win(ORIGINAL_STRATEGY);
            if self.config.record_original_success {
                self.remember(store, action, &url_ctx, original, metrics).await;
            }
            return Ok(HealingResult {
                success: true,
                attempts: 1,
                working_selector: Some(original.to_string()),
                strategy_name: Some(ORIGINAL_STRATEGY.to_string()),
                duration_ms: elapsed_ms(started),
                reflection_note: "Original selector worked.".to_string(),
            });
        }
        let first_reason = first.reason();

        // 2. Alternatives
        let query = PatternQuery::new(Some(action.action_kind), url_ctx.clone())
            .with_intent(action.intent.as_deref());
        let learned: Vec<String> = store::lookup(
            store,
            &query,
            self.config.learned_limit,
            &PatternFilter::successful(self.config.min_similarity),
            metrics,
        )
        .await
        .into_iter()
        .map(|scored| scored.pattern.selector)
        .collect();

        let alternatives = alternatives::build(
            original,
            &learned,
            action.intent.as_deref(),
            self.config.max_alternatives,
        );
        debug!(count = alternatives.len(), "Built alternatives");

        for (index, alternative) in alternatives.iter().enumerate() {
            let outcome = self.attempt(driver, alternative, action).await;
            debug!(selector = %alternative, outcome = ?outcome, "Alternative attempt");
            if let AttemptOutcome::Done(_) = outcome {
                let attempts = index as u32 + 2;
                metrics.alternative_successes += 1;
                metrics.record_win(ALTERNATIVE_STRATEGY);
                self.remember(store, action, &url_ctx, alternative, metrics).await;
                info!(
                    original = original,
                    healed = %alternative,
                    attempts,
                    "Healed with alternative selector"
                );
                return Ok(HealingResult {
                    success: true,
                    attempts,
                    working_selector: Some(alternative.clone()),
                    strategy_name: Some(ALTERNATIVE_STRATEGY.to_string()),
                    duration_ms: elapsed_ms(started),
                    reflection_note: format!(
                        "Original selector '{}' failed ({}); alternative '{}' worked on attempt {}.",
                        original, first_reason, alternative, attempts
                    ),
                });
            }
        }

        // 3. Resolver fallback
        let attempts = 1 + alternatives.len() as u32 + 1;
        let intent = Intent::for_action(action.action_kind, action.intent.as_deref());
        let resolution = resolver
            .resolve_match(driver, store, &intent, Some(action.action_kind), metrics)
            .await;

        let exhaustion = match resolution.matched {
            Some(found) => {
                let selector = found.candidate.selector.clone();
                let strategy = found.candidate.strategy_name.clone();
                match self.act(driver, found.element, action).await {
                    Ok(()) => {
                        metrics.resolver_successes += 1;
                        self.remember(store, action, &url_ctx, &selector, metrics).await;
                        info!(
                            original = original,
                            healed = %selector,
                            strategy = %strategy,
                            attempts,
                            "Healed through resolver"
                        );
                        return Ok(HealingResult {
                            success: true,
                            attempts,
                            working_selector: Some(selector.clone()),
                            strategy_name: Some(strategy.clone()),
                            duration_ms: elapsed_ms(started),
                            reflection_note: format!(
                                "Original selector '{}' and {} alternatives failed; resolver strategy {} found '{}'.",
                                original,
                                alternatives.len(),
                                strategy,
                                selector
                            ),
                        });
                    }
                    Err(reason) => format!(
                        "resolver matched '{}' ({}) but the action failed: {}",
                        selector, strategy, reason
                    ),
                }
            }
            None => format!(
                "resolver found nothing after {} candidates",
                resolution.attempts
            ),
        };

        // 4. Exhausted
        metrics.heal_failures += 1;
        info!(original = original, attempts, "Healing exhausted");
        Ok(HealingResult {
            success: false,
            attempts,
            working_selector: None,
            strategy_name: None,
            duration_ms: elapsed_ms(started),
            reflection_note: format!(
                "Healing exhausted for {} on '{}': original failed ({}), {} alternatives failed, {}.",
                action.action_kind,
                original,
                first_reason,
                alternatives.len(),
                exhaustion
            ),
        })
    }

    /// Locate `selector`, pick the target and act on it. Bounded by the
    /// action timeout as a whole.
    async fn attempt<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        selector: &str,
        action: &HealingAction,
    ) -> AttemptOutcome {
        let limit = self.config.action_timeout();
        match tokio::time::timeout(limit, self.attempt_inner(driver, selector, action)).await {
            Ok(outcome) => outcome,
            Err(_) => AttemptOutcome::Failed(format!("timed out after {}ms", limit.as_millis())),
        }
    }

    async fn attempt_inner<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        selector: &str,
        action: &HealingAction,
    ) -> AttemptOutcome {
        let matches = match selector::locate(driver, selector).await {
            Ok(matches) => matches,
            Err(e) => return AttemptOutcome::Failed(e.to_string()),
        };

        let target = match matches.as_slice() {
            [] => return AttemptOutcome::Missing,
            [only] => *only,
            many => match self.group_member(driver, action.action_kind, many).await {
                Some(handle) => handle,
                None => {
                    return AttemptOutcome::Failed(format!(
                        "ambiguous: {} elements match",
                        many.len()
                    ));
                }
            },
        };

        match driver.is_visible(target, self.config.visibility_timeout()).await {
            Ok(true) => {}
            Ok(false) => return AttemptOutcome::Failed("element not visible".into()),
            Err(e) => return AttemptOutcome::Failed(e.to_string()),
        }

        match self.act(driver, target, action).await {
            Ok(()) => AttemptOutcome::Done(target),
            Err(reason) => AttemptOutcome::Failed(reason),
        }
    }

    async fn act<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        element: ElementHandle,
        action: &HealingAction,
    ) -> Result<(), String> {
        let limit = self.config.action_timeout();
        match tokio::time::timeout(
            limit,
            driver.act(element, action.action_kind, action.value.as_deref()),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {}ms", limit.as_millis())),
        }
    }

    /// Several matches are only acceptable for `check` on one radio or
    /// checkbox group; the first visible member is taken.
    async fn group_member<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        kind: ActionKind,
        handles: &[ElementHandle],
    ) -> Option<ElementHandle> {
        if kind != ActionKind::Check {
            return None;
        }

        let mut group: Option<String> = None;
        for &handle in handles {
            let info = driver.describe(handle).await.ok()?;
            let checkable = info.tag == "input"
                && matches!(info.input_type().as_deref(), Some("radio" | "checkbox"));
            let name = info.attr("name").map(str::trim).filter(|n| !n.is_empty())?;
            if !checkable {
                return None;
            }
            match &group {
                Some(g) if g != name => return None,
                Some(_) => {}
                None => group = Some(name.to_string()),
            }
        }

        let wait = self.config.visibility_timeout();
        for &handle in handles {
            if let Ok(true) = driver.is_visible(handle, wait).await {
                return Some(handle);
            }
        }
        None
    }

    async fn remember(
        &self,
        store: &dyn PatternStore,
        action: &HealingAction,
        url_ctx: &str,
        selector: &str,
        metrics: &mut Metrics,
    ) {
        let pattern = LearnedPattern::success(action.action_kind, url_ctx, selector)
            .with_intent(action.intent.as_deref());
        store::record(store, pattern, metrics).await;
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
