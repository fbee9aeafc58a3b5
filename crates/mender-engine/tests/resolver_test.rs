use async_trait::async_trait;
use mender_engine::config::ResolverConfig;
use mender_engine::driver::HtmlDriver;
use mender_engine::error::StoreError;
use mender_engine::intent::Intent;
use mender_engine::metrics::Metrics;
use mender_engine::pattern::{LearnedPattern, PatternFilter, PatternId, PatternQuery, ScoredPattern};
use mender_engine::protocol::ActionKind;
use mender_engine::resolution::ElementResolver;
use mender_engine::store::{InMemoryPatternStore, PatternStore};

const URL: &str = "https://example.com/signup?step=1";

struct FlakyStore;

#[async_trait]
impl PatternStore for FlakyStore {
    async fn store(&self, _pattern: LearnedPattern) -> Result<PatternId, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn find_similar(
        &self,
        _query: &PatternQuery,
        _limit: usize,
        _filter: &PatternFilter,
    ) -> Result<Vec<ScoredPattern>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

fn page(body: &str) -> HtmlDriver {
    HtmlDriver::new(format!("<html><body>{}</body></html>", body)).with_url(URL)
}

#[tokio::test]
async fn test_semantic_id_resolves_email_field() {
    let mut driver = page(r#"<form><input id="email" type="email"></form>"#);
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().purpose("email"), &mut metrics)
        .await;

    assert!(result.found);
    assert_eq!(result.selector.as_deref(), Some("#email"));
    assert_eq!(result.strategy_name.as_deref(), Some("SemanticID"));
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.attempts, 1);
    assert_eq!(metrics.resolved, 1);
    assert_eq!(metrics.strategy_wins.get("SemanticID"), Some(&1));
}

#[tokio::test]
async fn test_most_specific_strategy_wins() {
    let mut driver = page(r#"<input id="email" name="email" aria-label="Email" class="email">"#);
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().purpose("email"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("SemanticID"));
}

#[tokio::test]
async fn test_resolution_is_repeatable() {
    let mut driver = page(r#"<input name="email"><button>Sign in</button>"#);
    let store = InMemoryPatternStore::new();
    let resolver = ElementResolver::default();
    let intent = Intent::input().purpose("email");
    let mut metrics = Metrics::new();

    let first = resolver.resolve(&mut driver, &store, &intent, &mut metrics).await;
    let second = resolver.resolve(&mut driver, &store, &intent, &mut metrics).await;

    assert_eq!(first, second);
    assert!(store.is_empty(), "plain resolution must not write patterns");
    assert_eq!(metrics.resolutions, 2);
}

#[tokio::test]
async fn test_confidence_follows_strategy_rank() {
    let learned = InMemoryPatternStore::with_patterns([LearnedPattern::success(
        ActionKind::Fill,
        "example.com/signup",
        "input.field-x",
    )
    .with_intent(Some("email"))]);
    let empty = InMemoryPatternStore::new();

    let cases: Vec<(&str, Intent, &InMemoryPatternStore, &str)> = vec![
        (r#"<input id="email">"#, Intent::input().purpose("email"), &empty, "SemanticID"),
        (r#"<input name="email">"#, Intent::input().purpose("email"), &empty, "NameAttribute"),
        (r#"<input aria-label="Email">"#, Intent::input().purpose("email"), &empty, "AriaLabel"),
        (r#"<input class="field-x">"#, Intent::input().purpose("email"), &learned, "LearnedPattern"),
        ("<button>Sign in</button>", Intent::button().text("Sign in"), &empty, "TextContent"),
        ("<button></button><button></button>", Intent::button(), &empty, "Positional"),
        (r#"<span class="promo-banner">Deal</span>"#, Intent::any().purpose("promo"), &empty, "FuzzyMatch"),
    ];

    let resolver = ElementResolver::default();
    let mut previous = f64::INFINITY;
    for (rank, (body, intent, store, expected)) in cases.into_iter().enumerate() {
        let mut driver = page(body);
        let mut metrics = Metrics::new();
        let result = resolver.resolve(&mut driver, store, &intent, &mut metrics).await;

        assert_eq!(result.strategy_name.as_deref(), Some(expected), "{}", body);
        assert!((result.confidence - (1.0 - rank as f64 / 7.0)).abs() < 1e-9);
        assert!(result.confidence < previous);
        previous = result.confidence;
    }
}

#[tokio::test]
async fn test_indistinguishable_elements_are_not_guessed() {
    let mut driver = page("<div></div><div></div>");
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::any(), &mut metrics)
        .await;

    assert!(!result.found);
    assert_eq!(result.selector, None);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(metrics.unresolved, 1);
}

#[tokio::test]
async fn test_unknown_purpose_finds_nothing() {
    let mut driver = page("<div></div><div></div>");
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::any().purpose("widget"), &mut metrics)
        .await;

    assert!(!result.found);
    assert!(result.attempts > 0);
    assert_eq!(result.attempts as u64, metrics.probes);
}

#[tokio::test]
async fn test_label_for_resolves_to_target() {
    let mut driver = page(r#"<label for="f1">Work email</label><input id="f1" type="text">"#);
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().aria_label("Work email"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("AriaLabel"));
    assert_eq!(result.selector.as_deref(), Some("#f1"));
}

#[tokio::test]
async fn test_aria_labelledby_resolves_to_target() {
    let mut driver = page(
        r#"<label id="coupon-label">Coupon code</label>
           <input type="text" aria-labelledby="coupon-label">"#,
    );
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().aria_label("coupon code"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("AriaLabel"));
    assert_eq!(result.selector.as_deref(), Some(r#"[aria-labelledby~="coupon-label"]"#));
}

#[tokio::test]
async fn test_button_text_resolves() {
    let mut driver = page("<button>Cancel</button><button>  Sign   in </button>");
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::button().text("Sign in"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("TextContent"));
    assert_eq!(result.selector.as_deref(), Some(r#"button:has-text("Sign in")"#));
}

#[tokio::test]
async fn test_ambiguous_candidates_fall_through() {
    let mut driver = page(r#"<input name="q"><input name="q">"#);
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().purpose("q"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("Positional"));
    assert!(metrics.ambiguous >= 1);
}

#[tokio::test]
async fn test_hidden_and_incompatible_candidates_are_skipped() {
    let mut driver = page(
        r#"<input id="email" type="email" style="display: none">
           <input name="email">"#,
    );
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();
    let resolver = ElementResolver::default();
    let intent = Intent::input().purpose("email");

    let result = resolver.resolve(&mut driver, &store, &intent, &mut metrics).await;
    assert_eq!(result.selector.as_deref(), Some(r#"[name="email"]"#));

    let mut driver = page(r#"<div id="email">Email</div><input name="email">"#);
    let result = resolver.resolve(&mut driver, &store, &intent, &mut metrics).await;
    assert_eq!(result.strategy_name.as_deref(), Some("NameAttribute"));
}

#[tokio::test]
async fn test_broken_learned_selector_is_skipped() {
    let store = InMemoryPatternStore::with_patterns([LearnedPattern::success(
        ActionKind::Fill,
        "example.com/signup",
        "div[",
    )
    .with_intent(Some("email"))]);
    let mut driver = page(r#"<textarea class="notes"></textarea>"#);
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().purpose("email"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("Positional"));
    assert_eq!(result.selector.as_deref(), Some("textarea"));
    assert_eq!(metrics.probe_errors, 1);
}

#[tokio::test]
async fn test_multi_word_purpose_reaches_every_test_attribute() {
    let mut driver = page(r#"<input data-qa="email"><input type="text">"#);
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().purpose("Email Address"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("NameAttribute"));
    assert_eq!(result.selector.as_deref(), Some(r#"[data-qa="email"]"#));
    assert!((result.confidence - 6.0 / 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_fuzzy_match_reaches_later_keywords() {
    let mut driver = page(r#"<div class="address-box">Ship to</div><div class="promo">Deal</div>"#);
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::any().purpose("Shipping address"), &mut metrics)
        .await;

    assert_eq!(result.strategy_name.as_deref(), Some("FuzzyMatch"));
    assert_eq!(result.selector.as_deref(), Some(r#"[class*="address" i]"#));
}

#[tokio::test]
async fn test_learned_pattern_for_other_purpose_is_ignored() {
    let store = InMemoryPatternStore::with_patterns([LearnedPattern::success(
        ActionKind::Fill,
        "example.com/signup",
        "#pwd",
    )
    .with_intent(Some("password"))]);
    let mut driver = page(r#"<input class="new-email-field" type="email"><input id="pwd" type="password">"#);
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &store, &Intent::input().purpose("email"), &mut metrics)
        .await;

    assert!(result.found);
    assert_ne!(result.strategy_name.as_deref(), Some("LearnedPattern"));
    assert_ne!(result.selector.as_deref(), Some("#pwd"));
    assert_eq!(result.strategy_name.as_deref(), Some("Positional"));
}

#[tokio::test]
async fn test_failing_store_degrades_to_static_strategies() {
    let mut driver = page(r#"<input class="newsletter-email">"#);
    let mut metrics = Metrics::new();

    let result = ElementResolver::default()
        .resolve(&mut driver, &FlakyStore, &Intent::input().purpose("email"), &mut metrics)
        .await;

    assert!(result.found);
    assert_eq!(result.strategy_name.as_deref(), Some("Positional"));
    assert_eq!(metrics.store_errors, 1);
}

#[tokio::test]
async fn test_recording_resolutions_when_enabled() {
    let mut driver = page(r#"<input id="email">"#);
    let store = InMemoryPatternStore::new();
    let mut metrics = Metrics::new();
    let resolver = ElementResolver::new(ResolverConfig {
        record_resolutions: true,
        ..Default::default()
    });

    resolver
        .resolve(&mut driver, &store, &Intent::input().purpose("email"), &mut metrics)
        .await;

    let stored = store.patterns().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].selector, "#email");
    assert_eq!(stored[0].action_kind, ActionKind::Fill);
    assert_eq!(stored[0].url_context, "example.com/signup");
    assert_eq!(stored[0].intent.as_deref(), Some("email"));
    assert_eq!(metrics.patterns_recorded, 1);
}
