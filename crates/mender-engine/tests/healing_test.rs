use async_trait::async_trait;
use mender_engine::Mender;
use mender_engine::config::{HealingConfig, MenderConfig};
use mender_engine::driver::{DomDriver, HtmlDriver};
use mender_engine::error::{ParseError, StoreError};
use mender_engine::healing::alternatives;
use mender_engine::healing::{HealError, HealingExecutor};
use mender_engine::intent::Intent;
use mender_engine::metrics::Metrics;
use mender_engine::pattern::{LearnedPattern, PatternFilter, PatternId, PatternQuery, ScoredPattern};
use mender_engine::protocol::{ActionKind, HealingAction};
use mender_engine::resolution::ElementResolver;
use mender_engine::store::{InMemoryPatternStore, PatternStore};
use std::sync::Arc;

const URL: &str = "https://shop.example.com/login";

struct FlakyStore;

#[async_trait]
impl PatternStore for FlakyStore {
    async fn store(&self, _pattern: LearnedPattern) -> Result<PatternId, StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn find_similar(
        &self,
        _query: &PatternQuery,
        _limit: usize,
        _filter: &PatternFilter,
    ) -> Result<Vec<ScoredPattern>, StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }
}

fn page(body: &str) -> HtmlDriver {
    HtmlDriver::new(format!("<html><body>{}</body></html>", body)).with_url(URL)
}

fn engine_with(store: &InMemoryPatternStore, config: MenderConfig) -> Mender {
    Mender::new(config, Arc::new(store.clone()))
}

#[tokio::test]
async fn test_original_selector_succeeds_first() {
    let mut driver = page(r#"<input id="email" type="email">"#);
    let store = InMemoryPatternStore::new();
    let mut mender = engine_with(&store, MenderConfig::default());

    let result = mender
        .execute(&mut driver, &HealingAction::fill("#email", "a@b.c"))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.working_selector.as_deref(), Some("#email"));
    assert_eq!(result.strategy_name.as_deref(), Some("Original"));

    let email = driver.query("#email").await.unwrap()[0];
    assert_eq!(driver.value_of(email), Some("a@b.c"));
    assert!(store.is_empty());
    assert_eq!(mender.metrics().original_successes, 1);
}

#[tokio::test]
async fn test_renamed_field_heals_with_synonym() {
    let mut driver = page(r#"<form><input class="new-email-field" type="email"></form>"#);
    let store = InMemoryPatternStore::new();
    let mut mender = engine_with(&store, MenderConfig::default());

    let action = HealingAction::fill("#email", "user@example.com").with_intent("email");
    let result = mender.execute(&mut driver, &action).await.unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.working_selector.as_deref(), Some(r#"input[type="email"]"#));
    assert_eq!(result.strategy_name.as_deref(), Some("Alternative"));
    assert!(result.reflection_note.contains("#email"));

    let stored = store.patterns().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].selector, r#"input[type="email"]"#);
    assert_eq!(stored[0].action_kind, ActionKind::Fill);
    assert_eq!(stored[0].url_context, "shop.example.com/login");

    let metrics = mender.metrics();
    assert_eq!(metrics.alternative_successes, 1);
    assert_eq!(metrics.patterns_recorded, 1);
    assert_eq!(metrics.strategy_wins.get("Alternative"), Some(&1));
}

#[tokio::test]
async fn test_healed_selector_becomes_learned_candidate() {
    let mut driver = page(r#"<form><input class="new-email-field" type="email"></form>"#);
    let mut mender = Mender::in_memory(MenderConfig::default());

    let action = HealingAction::fill("#email", "user@example.com").with_intent("email");
    assert!(mender.execute(&mut driver, &action).await.unwrap().success);

    let result = mender
        .resolve(&mut driver, &Intent::input().purpose("email"))
        .await;

    assert!(result.found);
    assert_eq!(result.strategy_name.as_deref(), Some("LearnedPattern"));
    assert_eq!(result.selector.as_deref(), Some(r#"input[type="email"]"#));
}

#[tokio::test]
async fn test_learned_patterns_are_tried_before_relaxations() {
    let store = InMemoryPatternStore::with_patterns([LearnedPattern::success(
        ActionKind::Fill,
        "shop.example.com/login",
        "input.mail-v2",
    )
    .with_intent(Some("email"))]);
    let mut driver = page(r#"<input class="mail-v2" type="email">"#);
    let mut mender = engine_with(&store, MenderConfig::default());

    let action = HealingAction::fill("#email", "user@example.com").with_intent("email");
    let result = mender.execute(&mut driver, &action).await.unwrap();

    assert_eq!(result.attempts, 2);
    assert_eq!(result.working_selector.as_deref(), Some("input.mail-v2"));
}

#[tokio::test]
async fn test_learned_selector_for_other_intent_is_not_used() {
    let store = InMemoryPatternStore::with_patterns([LearnedPattern::success(
        ActionKind::Fill,
        "shop.example.com/login",
        "#pwd",
    )
    .with_intent(Some("password"))]);
    let mut driver =
        page(r#"<form><input class="new-email-field" type="email"><input id="pwd" type="password"></form>"#);
    let mut mender = engine_with(&store, MenderConfig::default());

    let action = HealingAction::fill("#email", "user@example.com").with_intent("email");
    let result = mender.execute(&mut driver, &action).await.unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.working_selector.as_deref(), Some(r#"input[type="email"]"#));

    let pwd = driver.query("#pwd").await.unwrap()[0];
    let email = driver.query("input.new-email-field").await.unwrap()[0];
    assert_eq!(driver.value_of(pwd), None);
    assert_eq!(driver.value_of(email), Some("user@example.com"));

    let stored = store.patterns().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].selector, r#"input[type="email"]"#);
    assert_eq!(stored[1].intent.as_deref(), Some("email"));
}

#[tokio::test]
async fn test_structural_relaxation() {
    let mut driver =
        page(r#"<form><div class="row"><span></span><input class="user-field"></div></form>"#);
    let mut mender = Mender::in_memory(MenderConfig::default());

    let action = HealingAction::click("form > div.row > input.user-field.legacy:nth-child(3)");
    let result = mender.execute(&mut driver, &action).await.unwrap();

    assert!(result.success);
    assert_eq!(result.working_selector.as_deref(), Some("form div.row input.user-field"));
    assert_eq!(result.attempts, 6);
}

#[tokio::test]
async fn test_bare_id_relaxation() {
    let mut driver = page(r#"<div><button id="checkout" class="btn">Pay</button></div>"#);
    let mut mender = Mender::in_memory(MenderConfig::default());

    let result = mender
        .execute(
            &mut driver,
            &HealingAction::click("main #checkout.btn.btn-lg:nth-of-type(9)"),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.working_selector.as_deref(), Some("#checkout"));
    assert_eq!(result.attempts, 5);
}

#[tokio::test]
async fn test_resolver_fallback_after_alternatives() {
    let mut driver = page("<form><button>Apply coupon</button></form>");
    let store = InMemoryPatternStore::new();
    let mut mender = engine_with(&store, MenderConfig::default());

    let action = HealingAction::click("#old-coupon").with_intent("Apply coupon");
    let result = mender.execute(&mut driver, &action).await.unwrap();

    let alts = alternatives::build(
        "#old-coupon",
        &[],
        Some("Apply coupon"),
        HealingConfig::default().max_alternatives,
    );
    assert!(result.success);
    assert_eq!(result.attempts, 1 + alts.len() as u32 + 1);
    assert_eq!(result.strategy_name.as_deref(), Some("TextContent"));
    assert_eq!(
        result.working_selector.as_deref(),
        Some(r#"button:has-text("Apply coupon")"#)
    );
    assert_eq!(mender.metrics().resolver_successes, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_exhaustion_reports_every_attempt() {
    let mut driver = page("<p>Nothing to fill here</p>");
    let mut mender = Mender::in_memory(MenderConfig::default());

    let action = HealingAction::fill("#email", "user@example.com").with_intent("email");
    let result = mender.execute(&mut driver, &action).await.unwrap();

    let alts = alternatives::build(
        "#email",
        &[],
        Some("email"),
        HealingConfig::default().max_alternatives,
    );
    assert!(!result.success);
    assert_eq!(result.attempts, 1 + alts.len() as u32 + 1);
    assert_eq!(result.working_selector, None);
    assert_eq!(result.strategy_name, None);
    assert!(result.reflection_note.contains("exhausted"));
    assert_eq!(mender.metrics().heal_failures, 1);
    assert!(driver.actions().is_empty());
}

#[tokio::test]
async fn test_disabled_element_is_not_acted_on() {
    let mut driver = page(r#"<button id="go" disabled>Go</button>"#);
    let mut mender = Mender::in_memory(MenderConfig::default());

    let result = mender
        .execute(&mut driver, &HealingAction::click("#go"))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.attempts, 2);
    assert!(result.reflection_note.contains("disabled"));
    assert!(driver.actions().is_empty());
}

#[tokio::test]
async fn test_check_accepts_radio_group() {
    let group = r#"<input type="radio" name="plan" value="basic">
                   <input type="radio" name="plan" value="pro">"#;
    let mut driver = page(group);
    let mut mender = Mender::in_memory(MenderConfig::default());

    let result = mender
        .execute(&mut driver, &HealingAction::check(r#"input[name="plan"]"#))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 1);
    let radios = driver.query(r#"input[name="plan"]"#).await.unwrap();
    assert!(driver.is_checked(radios[0]));
    assert!(!driver.is_checked(radios[1]));

    let mut driver = page(group);
    let result = mender
        .execute(&mut driver, &HealingAction::click(r#"input[name="plan"]"#))
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.reflection_note.contains("ambiguous"));
}

#[tokio::test]
async fn test_select_option() {
    let mut driver = page(
        r#"<select id="country"><option value="de">Germany</option><option value="fr">France</option></select>"#,
    );
    let mut mender = Mender::in_memory(MenderConfig::default());

    let result = mender
        .execute(&mut driver, &HealingAction::select("#country", "fr"))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(driver.actions()[0].kind, ActionKind::Select);
    assert_eq!(driver.actions()[0].value.as_deref(), Some("fr"));

    let result = mender
        .execute(&mut driver, &HealingAction::select("#country", "it"))
        .await
        .unwrap();
    assert!(!result.success);
}

#[tokio::test]
async fn test_caller_errors_are_rejected_before_the_page() {
    let mut driver = page(r#"<input id="email">"#);
    let mut mender = Mender::in_memory(MenderConfig::default());

    let missing = mender
        .execute(&mut driver, &HealingAction::new(ActionKind::Fill, "#email"))
        .await;
    assert_eq!(missing, Err(HealError::MissingValue(ActionKind::Fill)));

    let malformed = mender
        .execute(&mut driver, &HealingAction::click("div["))
        .await;
    assert!(matches!(malformed, Err(HealError::InvalidSelector(_))));

    let unknown = mender
        .execute_raw(&mut driver, "hover", "#email", None, None)
        .await;
    assert_eq!(
        unknown,
        Err(HealError::InvalidAction(ParseError::UnknownActionKind(
            "hover".into()
        )))
    );

    assert_eq!(mender.metrics().heals, 0);
    assert!(driver.actions().is_empty());
}

#[tokio::test]
async fn test_original_success_recorded_when_enabled() {
    let store = InMemoryPatternStore::new();
    let config = MenderConfig {
        healing: HealingConfig {
            record_original_success: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut mender = engine_with(&store, config);
    let mut driver = page(r#"<button id="save">Save</button>"#);

    let result = mender
        .execute(&mut driver, &HealingAction::click("#save").with_intent("save"))
        .await
        .unwrap();

    assert!(result.success);
    let stored = store.patterns().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].selector, "#save");
    assert_eq!(stored[0].intent.as_deref(), Some("save"));
}

#[tokio::test]
async fn test_failing_store_does_not_block_healing() {
    let mut driver = page(r#"<input class="new-email-field" type="email">"#);
    let executor = HealingExecutor::default();
    let resolver = ElementResolver::default();
    let mut metrics = Metrics::new();

    let action = HealingAction::fill("#email", "user@example.com").with_intent("email");
    let result = executor
        .execute(&mut driver, &resolver, &FlakyStore, &action, &mut metrics)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert_eq!(metrics.store_errors, 2);
    assert_eq!(metrics.patterns_recorded, 0);
}
