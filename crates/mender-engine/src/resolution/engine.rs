use super::context::{DomContext, GatherOptions};
use super::strategy::StrategyCatalog;
use super::validation::{Miss, ProbeOutcome, probe};
use crate::config::ResolverConfig;
use crate::driver::{DomDriver, ElementHandle};
use crate::metrics::Metrics;
use crate::store::{self, PatternStore};
use mender_common::intent::{ElementType, Intent};
use mender_common::pattern::LearnedPattern;
use mender_common::protocol::{ActionKind, Candidate, ResolutionResult};
use tracing::debug;

/// A validated candidate and the element it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub candidate: Candidate,
    pub element: ElementHandle,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub matched: Option<Resolved>,
    /// Candidates probed.
    pub attempts: u32,
    pub url_context: String,
}

impl Resolution {
    pub fn to_result(&self) -> ResolutionResult {
        match &self.matched {
            Some(m) => ResolutionResult::found(&m.candidate, m.confidence, self.attempts),
            None => ResolutionResult::not_found(self.attempts),
        }
    }
}

/// Walks the strategy catalog in priority order and returns the first
/// candidate that survives validation.
#[derive(Debug, Clone, Default)]
pub struct ElementResolver {
    catalog: StrategyCatalog,
    config: ResolverConfig,
}

impl ElementResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            catalog: StrategyCatalog::standard(),
            config,
        }
    }

    pub fn with_catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Resolve an intent to a result. Failure to find is `found: false`,
    /// never an error.
    pub async fn resolve<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        store: &dyn PatternStore,
        intent: &Intent,
        metrics: &mut Metrics,
    ) -> ResolutionResult {
        let resolution = self.resolve_match(driver, store, intent, None, metrics).await;

        if self.config.record_resolutions
            && let Some(m) = &resolution.matched
        {
            let pattern = LearnedPattern::success(
                implied_action(intent),
                resolution.url_context.clone(),
                m.candidate.selector.clone(),
            )
            .with_intent(intent.purpose.as_deref());
            store::record(store, pattern, metrics).await;
        }

        resolution.to_result()
    }

    /// Like [`resolve`](Self::resolve) but keeps the element handle, and
    /// scopes learned patterns to `action_kind` when given.
    pub async fn resolve_match<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        store: &dyn PatternStore,
        intent: &Intent,
        action_kind: Option<ActionKind>,
        metrics: &mut Metrics,
    ) -> Resolution {
        let ctx = DomContext::gather(
            driver,
            store,
            GatherOptions {
                action_kind,
                intent_hint: intent.purpose.as_deref(),
                learned_limit: self.config.learned_limit,
                min_similarity: self.config.min_similarity,
            },
            metrics,
        )
        .await;
        self.resolve_in(driver, &ctx, intent, metrics).await
    }

    /// Resolve against an already gathered context.
    pub async fn resolve_in<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        ctx: &DomContext,
        intent: &Intent,
        metrics: &mut Metrics,
    ) -> Resolution {
        metrics.resolutions += 1;
        let mut attempts = 0u32;

        for strategy in self.catalog.strategies() {
            let candidates = strategy.generate(intent, ctx);
            if candidates.is_empty() {
                continue;
            }

            for candidate in candidates
                .into_iter()
                .take(self.config.max_candidates_per_strategy)
            {
                attempts += 1;
                metrics.probes += 1;

                let outcome = probe(
                    driver,
                    &candidate.selector,
                    candidate.uniqueness,
                    intent.element_type,
                    self.config.probe_timeout(),
                )
                .await;

                debug!(
                    strategy = strategy.name(),
                    selector = %candidate.selector,
                    outcome = ?outcome,
                    "Probed candidate"
                );

                match outcome {
                    ProbeOutcome::Found(element) => {
                        metrics.resolved += 1;
                        metrics.record_win(strategy.name());
                        return Resolution {
                            matched: Some(Resolved {
                                // Full-catalog score, even for a trimmed catalog.
                                confidence: strategy.confidence(),
                                candidate,
                                element,
                            }),
                            attempts,
                            url_context: ctx.url_context.clone(),
                        };
                    }
                    ProbeOutcome::NotFound(Miss::Ambiguous(_)) => metrics.ambiguous += 1,
                    ProbeOutcome::NotFound(_) => {}
                    ProbeOutcome::Error(_) => metrics.probe_errors += 1,
                }
            }
        }

        metrics.unresolved += 1;
        debug!(attempts, "No strategy produced a valid candidate");
        Resolution {
            matched: None,
            attempts,
            url_context: ctx.url_context.clone(),
        }
    }
}

/// Action kind a plain resolution is recorded under.
fn implied_action(intent: &Intent) -> ActionKind {
    match intent.element_type {
        ElementType::Input => ActionKind::Fill,
        _ => ActionKind::Click,
    }
}
