use crate::driver::DomDriver;
use crate::metrics::Metrics;
use crate::selector::normalize_text;
use crate::store::{self, PatternStore};
use mender_common::pattern::{LearnedPattern, PatternFilter, PatternQuery, url_context};
use mender_common::protocol::ActionKind;
use tracing::debug;

/// A `<label>` as seen on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelInfo {
    /// Normalized text.
    pub text: String,
    /// Target of `for="…"`.
    pub for_id: Option<String>,
    /// The label's own id, for `aria-labelledby` references.
    pub id: Option<String>,
}

/// Everything strategies may consult, gathered once per resolution.
#[derive(Debug, Clone, Default)]
pub struct DomContext {
    pub url: String,
    pub url_context: String,
    pub action_kind: Option<ActionKind>,
    /// Successful learned patterns, best match first.
    pub learned: Vec<LearnedPattern>,
    pub labels: Vec<LabelInfo>,
}

/// Knobs for [`DomContext::gather`].
#[derive(Debug, Clone)]
pub struct GatherOptions<'a> {
    pub action_kind: Option<ActionKind>,
    pub intent_hint: Option<&'a str>,
    pub learned_limit: usize,
    pub min_similarity: f64,
}

impl DomContext {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            url_context: url_context(&url),
            url,
            ..Default::default()
        }
    }

    pub fn with_learned(mut self, learned: Vec<LearnedPattern>) -> Self {
        self.learned = learned;
        self
    }

    pub fn with_labels(mut self, labels: Vec<LabelInfo>) -> Self {
        self.labels = labels;
        self
    }

    /// Read URL, learned patterns and labels from the page and the store.
    /// Nothing here fails the resolution: driver and store errors leave the
    /// corresponding part empty.
    pub async fn gather<D: DomDriver + ?Sized>(
        driver: &mut D,
        store: &dyn PatternStore,
        options: GatherOptions<'_>,
        metrics: &mut Metrics,
    ) -> Self {
        let url = match driver.current_url().await {
            Ok(url) => url,
            Err(e) => {
                debug!("Could not read current URL: {}", e);
                String::new()
            }
        };
        let mut ctx = Self::new(url);
        ctx.action_kind = options.action_kind;

        let query = PatternQuery::new(options.action_kind, ctx.url_context.clone())
            .with_intent(options.intent_hint);
        ctx.learned = store::lookup(
            store,
            &query,
            options.learned_limit,
            &PatternFilter::successful(options.min_similarity),
            metrics,
        )
        .await
        .into_iter()
        .map(|scored| scored.pattern)
        .collect();

        ctx.labels = collect_labels(driver).await;
        ctx
    }

    /// Labels whose text equals or contains `text` (normalized).
    pub fn labels_matching<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a LabelInfo> + 'a {
        let needle = normalize_text(text);
        self.labels
            .iter()
            .filter(move |l| !needle.is_empty() && l.text.contains(&needle))
    }
}

async fn collect_labels<D: DomDriver + ?Sized>(driver: &mut D) -> Vec<LabelInfo> {
    let handles = match driver.query("label").await {
        Ok(handles) => handles,
        Err(e) => {
            debug!("Label scan failed: {}", e);
            return Vec::new();
        }
    };

    let mut labels = Vec::with_capacity(handles.len());
    for handle in handles {
        let Ok(info) = driver.describe(handle).await else {
            continue;
        };
        let for_id = info
            .attr("for")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let id = info.id().map(str::to_string);
        if for_id.is_none() && id.is_none() {
            continue;
        }
        labels.push(LabelInfo {
            text: normalize_text(&info.text),
            for_id,
            id,
        });
    }
    labels
}
