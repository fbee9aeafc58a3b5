use crate::config::MenderConfig;
use crate::driver::{DomDriver, DriverError, ElementHandle};
use crate::healing::{HealError, HealingExecutor};
use crate::metrics::Metrics;
use crate::resolution::ElementResolver;
use crate::store::{FilePatternStore, InMemoryPatternStore, PatternStore};
use crate::synthesis::SelectorSynthesizer;
use mender_common::error::StoreError;
use mender_common::intent::Intent;
use mender_common::protocol::{HealingAction, HealingResult, ResolutionResult};
use std::sync::Arc;
use tracing::info;

/// The caller-facing surface: resolve, execute, synthesize.
///
/// One instance owns its metrics. The pattern store is shared and may be
/// handed to several engines.
pub struct Mender {
    resolver: ElementResolver,
    healer: HealingExecutor,
    synthesizer: SelectorSynthesizer,
    store: Arc<dyn PatternStore>,
    config: MenderConfig,
    metrics: Metrics,
}

impl Mender {
    pub fn new(config: MenderConfig, store: Arc<dyn PatternStore>) -> Self {
        Self {
            resolver: ElementResolver::new(config.resolver.clone()),
            healer: HealingExecutor::new(config.healing.clone()),
            synthesizer: SelectorSynthesizer::new(),
            store,
            config,
            metrics: Metrics::new(),
        }
    }

    pub fn in_memory(config: MenderConfig) -> Self {
        Self::new(config, Arc::new(InMemoryPatternStore::new()))
    }

    /// Build with the store named in `config.store`, in memory when unset.
    pub async fn from_config(config: MenderConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn PatternStore> = match &config.store.path {
            Some(path) => {
                info!("Using pattern store at {}", path.display());
                Arc::new(FilePatternStore::open(path.clone()).await?)
            }
            None => Arc::new(InMemoryPatternStore::new()),
        };
        Ok(Self::new(config, store))
    }

    pub async fn resolve<D: DomDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        intent: &Intent,
    ) -> ResolutionResult {
        self.resolver
            .resolve(driver, self.store.as_ref(), intent, &mut self.metrics)
            .await
    }

    pub async fn execute<D: DomDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        action: &HealingAction,
    ) -> Result<HealingResult, HealError> {
        self.healer
            .execute(
                driver,
                &self.resolver,
                self.store.as_ref(),
                action,
                &mut self.metrics,
            )
            .await
    }

    /// [`execute`](Self::execute) for loosely-typed input; an unknown action
    /// kind is `HealError::InvalidAction`.
    pub async fn execute_raw<D: DomDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        action_kind: &str,
        original_selector: &str,
        value: Option<String>,
        intent: Option<String>,
    ) -> Result<HealingResult, HealError> {
        let action = HealingAction::parse(action_kind, original_selector, value, intent)?;
        self.execute(driver, &action).await
    }

    pub async fn synthesize<D: DomDriver + ?Sized>(
        &self,
        driver: &mut D,
        element: ElementHandle,
    ) -> Result<String, DriverError> {
        self.synthesizer.synthesize(driver, element).await
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Return the counters gathered so far and start from zero.
    pub fn reset_metrics(&mut self) -> Metrics {
        std::mem::take(&mut self.metrics)
    }

    pub fn store(&self) -> Arc<dyn PatternStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &MenderConfig {
        &self.config
    }
}
