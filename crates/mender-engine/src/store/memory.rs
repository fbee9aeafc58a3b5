use super::{PatternStore, rank};
use async_trait::async_trait;
use mender_common::error::StoreError;
use mender_common::pattern::{LearnedPattern, PatternFilter, PatternId, PatternQuery, ScoredPattern};
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-local store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct InMemoryPatternStore {
    patterns: Arc<Mutex<Vec<LearnedPattern>>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns(patterns: impl IntoIterator<Item = LearnedPattern>) -> Self {
        Self {
            patterns: Arc::new(Mutex::new(patterns.into_iter().collect())),
        }
    }

    /// Snapshot of every stored pattern, oldest first.
    pub fn patterns(&self) -> Result<Vec<LearnedPattern>, StoreError> {
        Ok(self.lock()?.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LearnedPattern>>, StoreError> {
        self.patterns
            .lock()
            .map_err(|_| StoreError::Unavailable("pattern store lock poisoned".into()))
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn store(&self, pattern: LearnedPattern) -> Result<PatternId, StoreError> {
        if pattern.selector.trim().is_empty() {
            return Err(StoreError::InvalidPattern("empty selector".into()));
        }
        let mut patterns = self.lock()?;
        patterns.push(pattern);
        Ok(patterns.len() as PatternId)
    }

    async fn find_similar(
        &self,
        query: &PatternQuery,
        limit: usize,
        filter: &PatternFilter,
    ) -> Result<Vec<ScoredPattern>, StoreError> {
        let patterns = self.lock()?;
        rank(
            patterns
                .iter()
                .enumerate()
                .map(|(i, p)| (i as PatternId + 1, p)),
            query,
            limit,
            filter,
        )
    }
}
