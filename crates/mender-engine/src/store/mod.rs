//! Pattern store client: the read/write seam to historically successful
//! (context, selector) associations.

pub mod file;
pub mod memory;

pub use file::FilePatternStore;
pub use memory::InMemoryPatternStore;

use crate::metrics::Metrics;
use crate::resolution::hints::canonical_key;
use async_trait::async_trait;
use mender_common::error::StoreError;
use mender_common::pattern::{LearnedPattern, PatternFilter, PatternId, PatternQuery, ScoredPattern};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Weight of URL-context similarity when both sides carry an intent tag.
const URL_WEIGHT: f64 = 0.6;

/// Append-only pattern storage. Implementations decide their own
/// consistency discipline; the engine never updates or deletes entries.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn store(&self, pattern: LearnedPattern) -> Result<PatternId, StoreError>;

    /// Patterns ranked by similarity to `query`, best first, at most `limit`.
    async fn find_similar(
        &self,
        query: &PatternQuery,
        limit: usize,
        filter: &PatternFilter,
    ) -> Result<Vec<ScoredPattern>, StoreError>;
}

/// Score a stored pattern against a query. `None` when the action kinds
/// differ, or when both sides carry an intent and the intents name different
/// purposes.
pub fn similarity(query: &PatternQuery, pattern: &LearnedPattern) -> Option<f64> {
    if let Some(kind) = query.action_kind
        && kind != pattern.action_kind
    {
        return None;
    }

    let url = strsim::normalized_levenshtein(&query.url_context, &pattern.url_context);
    match (query.intent.as_deref(), pattern.intent.as_deref()) {
        (Some(a), Some(b)) => {
            if canonical_key(a) != canonical_key(b) {
                return None;
            }
            Some(URL_WEIGHT * url + (1.0 - URL_WEIGHT))
        }
        _ => Some(url),
    }
}

/// Filter, score and rank `(id, pattern)` pairs. Shared by every store so
/// ranking is identical regardless of backing.
///
/// Ties on similarity go to the newest pattern. Each selector appears once,
/// at its best rank.
pub fn rank<'a, I>(
    patterns: I,
    query: &PatternQuery,
    limit: usize,
    filter: &PatternFilter,
) -> Result<Vec<ScoredPattern>, StoreError>
where
    I: IntoIterator<Item = (PatternId, &'a LearnedPattern)>,
{
    let url_glob = filter
        .url_pattern
        .as_deref()
        .map(glob::Pattern::new)
        .transpose()
        .map_err(|e| StoreError::InvalidPattern(e.to_string()))?;

    let mut scored: Vec<ScoredPattern> = patterns
        .into_iter()
        .filter(|(_, p)| !filter.success_only || p.success)
        .filter(|(_, p)| url_glob.as_ref().is_none_or(|g| g.matches(&p.url_context)))
        .filter_map(|(id, p)| {
            let similarity = similarity(query, p)?;
            (similarity >= filter.min_similarity).then(|| ScoredPattern {
                id,
                pattern: p.clone(),
                similarity,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then(b.pattern.timestamp.cmp(&a.pattern.timestamp))
    });

    let mut seen = HashSet::new();
    scored.retain(|s| seen.insert(s.pattern.selector.clone()));
    scored.truncate(limit);
    Ok(scored)
}

/// Look up learned patterns, degrading to an empty list when the store fails.
pub async fn lookup(
    store: &dyn PatternStore,
    query: &PatternQuery,
    limit: usize,
    filter: &PatternFilter,
    metrics: &mut Metrics,
) -> Vec<ScoredPattern> {
    if limit == 0 {
        return Vec::new();
    }
    match store.find_similar(query, limit, filter).await {
        Ok(found) => {
            debug!(
                url_context = %query.url_context,
                count = found.len(),
                "Learned patterns loaded"
            );
            found
        }
        Err(e) => {
            warn!("Pattern store lookup failed, skipping learned candidates: {}", e);
            metrics.store_errors += 1;
            Vec::new()
        }
    }
}

/// Append a pattern, logging rather than failing when the store is down.
pub async fn record(
    store: &dyn PatternStore,
    pattern: LearnedPattern,
    metrics: &mut Metrics,
) -> Option<PatternId> {
    let selector = pattern.selector.clone();
    match store.store(pattern).await {
        Ok(id) => {
            debug!(id, selector = %selector, "Pattern recorded");
            metrics.patterns_recorded += 1;
            Some(id)
        }
        Err(e) => {
            warn!("Failed to record pattern for '{}': {}", selector, e);
            metrics.store_errors += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_common::protocol::ActionKind;

    fn pattern(kind: ActionKind, url: &str, selector: &str, ts: u64) -> LearnedPattern {
        LearnedPattern {
            timestamp: ts,
            ..LearnedPattern::success(kind, url, selector)
        }
    }

    #[test]
    fn test_similarity_excludes_other_action_kinds() {
        let query = PatternQuery::new(Some(ActionKind::Fill), "example.com/login");
        let p = pattern(ActionKind::Click, "example.com/login", "#go", 1);
        assert_eq!(similarity(&query, &p), None);

        let any = PatternQuery::new(None, "example.com/login");
        assert_eq!(similarity(&any, &p), Some(1.0));
    }

    #[test]
    fn test_similarity_weighs_matching_intent() {
        let query = PatternQuery::new(Some(ActionKind::Fill), "example.com/login")
            .with_intent(Some("email"));
        let same = pattern(ActionKind::Fill, "example.com/login", "#a", 1).with_intent(Some("email"));
        let alias =
            pattern(ActionKind::Fill, "example.com/login", "#b", 1).with_intent(Some("E-Mail"));
        let nearby =
            pattern(ActionKind::Fill, "example.com/signup", "#c", 1).with_intent(Some("email"));
        let untagged = pattern(ActionKind::Fill, "example.com/signup", "#d", 1);

        let s_same = similarity(&query, &same).unwrap();
        assert!((s_same - 1.0).abs() < 1e-9);
        assert_eq!(similarity(&query, &alias), Some(s_same));

        let s_nearby = similarity(&query, &nearby).unwrap();
        let s_untagged = similarity(&query, &untagged).unwrap();
        assert!(s_nearby < s_same);
        assert!(s_untagged < s_nearby);
    }

    #[test]
    fn test_similarity_rejects_conflicting_intent() {
        let query = PatternQuery::new(Some(ActionKind::Fill), "example.com/login")
            .with_intent(Some("email"));
        let password =
            pattern(ActionKind::Fill, "example.com/login", "#pwd", 1).with_intent(Some("password"));
        let pwd = pattern(ActionKind::Fill, "example.com/login", "#pwd", 1).with_intent(Some("pwd"));
        assert_eq!(similarity(&query, &password), None);
        assert_eq!(similarity(&query, &pwd), None);

        let ranked = rank(
            vec![(1, &password)],
            &query,
            10,
            &PatternFilter::successful(0.0),
        )
        .unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_orders_dedups_and_limits() {
        let a = pattern(ActionKind::Click, "example.com/login", "#old", 1);
        let b = pattern(ActionKind::Click, "example.com/login", "#new", 5);
        let c = pattern(ActionKind::Click, "example.com/login", "#new", 3);
        let d = pattern(ActionKind::Click, "other.org/cart", "#far", 9);
        let query = PatternQuery::new(Some(ActionKind::Click), "example.com/login");

        let ranked = rank(
            vec![(1, &a), (2, &b), (3, &c), (4, &d)],
            &query,
            10,
            &PatternFilter::successful(0.5),
        )
        .unwrap();
        let selectors: Vec<_> = ranked.iter().map(|s| s.pattern.selector.as_str()).collect();
        assert_eq!(selectors, vec!["#new", "#old"]);
        assert_eq!(ranked[0].id, 2);

        let one = rank(vec![(1, &a), (2, &b)], &query, 1, &PatternFilter::default()).unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn test_rank_applies_success_and_glob_filters() {
        let ok = pattern(ActionKind::Click, "example.com/login", "#ok", 1);
        let failed = LearnedPattern::new(ActionKind::Click, "example.com/login", "#bad", false);
        let query = PatternQuery::new(None, "example.com/login");

        let filter = PatternFilter {
            success_only: true,
            min_similarity: 0.0,
            url_pattern: Some("example.com/*".into()),
        };
        let ranked = rank(vec![(1, &ok), (2, &failed)], &query, 10, &filter).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].pattern.selector, "#ok");

        let miss = PatternFilter {
            url_pattern: Some("shop.*".into()),
            ..filter.clone()
        };
        assert!(rank(vec![(1, &ok)], &query, 10, &miss).unwrap().is_empty());

        let broken = PatternFilter {
            url_pattern: Some("[".into()),
            ..filter
        };
        assert!(matches!(
            rank(vec![(1, &ok)], &query, 10, &broken),
            Err(StoreError::InvalidPattern(_))
        ));
    }
}
