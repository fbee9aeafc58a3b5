use mender_engine::Mender;
use mender_engine::config::{MenderConfig, StoreConfig};
use mender_engine::driver::HtmlDriver;
use mender_engine::intent::Intent;
use mender_engine::pattern::{LearnedPattern, PatternFilter, PatternQuery};
use mender_engine::protocol::{ActionKind, HealingAction};
use mender_engine::store::{FilePatternStore, InMemoryPatternStore, PatternStore};
use tempfile::TempDir;

fn pattern(kind: ActionKind, url: &str, selector: &str, intent: Option<&str>) -> LearnedPattern {
    LearnedPattern::success(kind, url, selector).with_intent(intent)
}

#[tokio::test]
async fn test_file_store_persists_across_instances() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("patterns.jsonl");

    let store = FilePatternStore::open(&path).await.unwrap();
    let first = store
        .store(pattern(ActionKind::Fill, "example.com/login", "#email", Some("email")))
        .await
        .unwrap();
    let second = store
        .store(pattern(ActionKind::Click, "example.com/login", "#go", None))
        .await
        .unwrap();
    assert_eq!((first, second), (1, 2));
    drop(store);

    let reopened = FilePatternStore::open(&path).await.unwrap();
    let loaded = reopened.load().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].1.selector, "#email");

    let query = PatternQuery::new(Some(ActionKind::Fill), "example.com/login").with_intent(Some("email"));
    let found = reopened
        .find_similar(&query, 5, &PatternFilter::successful(0.5))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 1);
    assert_eq!(found[0].pattern.selector, "#email");
    assert!((found[0].similarity - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_file_store_skips_malformed_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("patterns.jsonl");
    let good = serde_json::to_string(&pattern(ActionKind::Click, "a.com", "#ok", None)).unwrap();
    tokio::fs::write(&path, format!("{{not json\n{}\n", good))
        .await
        .unwrap();

    let store = FilePatternStore::open(&path).await.unwrap();
    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].0, 2);

    let id = store
        .store(pattern(ActionKind::Click, "a.com", "#next", None))
        .await
        .unwrap();
    assert_eq!(id, 3);
}

#[tokio::test]
async fn test_ranking_prefers_closer_context_then_newer() {
    let mut older = pattern(ActionKind::Fill, "shop.example.com/login", "#old", Some("email"));
    older.timestamp = 1_000;
    let mut newer = pattern(ActionKind::Fill, "shop.example.com/login", "#new", Some("email"));
    newer.timestamp = 2_000;
    let elsewhere = pattern(ActionKind::Fill, "shop.example.com/account/settings", "#far", Some("email"));
    let other_kind = pattern(ActionKind::Click, "shop.example.com/login", "#btn", Some("email"));
    let failed = LearnedPattern::new(ActionKind::Fill, "shop.example.com/login", "#bad", false);

    let store = InMemoryPatternStore::with_patterns([older, newer, elsewhere, other_kind, failed]);
    let query = PatternQuery::new(Some(ActionKind::Fill), "shop.example.com/login").with_intent(Some("email"));

    let found = store
        .find_similar(&query, 10, &PatternFilter::successful(0.0))
        .await
        .unwrap();
    let selectors: Vec<&str> = found.iter().map(|s| s.pattern.selector.as_str()).collect();
    assert_eq!(selectors, vec!["#new", "#old", "#far"]);
    assert!(found.windows(2).all(|w| w[0].similarity >= w[1].similarity));

    let limited = store
        .find_similar(&query, 1, &PatternFilter::successful(0.0))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_url_glob_filter() {
    let store = InMemoryPatternStore::with_patterns([
        pattern(ActionKind::Click, "shop.example.com/cart", "#a", None),
        pattern(ActionKind::Click, "blog.example.com/cart", "#b", None),
    ]);
    let filter = PatternFilter {
        url_pattern: Some("shop.*".into()),
        ..PatternFilter::successful(0.0)
    };
    let found = store
        .find_similar(&PatternQuery::new(None, "shop.example.com/cart"), 10, &filter)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pattern.selector, "#a");

    let broken = PatternFilter {
        url_pattern: Some("[".into()),
        ..PatternFilter::default()
    };
    assert!(
        store
            .find_similar(&PatternQuery::default(), 10, &broken)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_engine_learns_into_configured_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("patterns.jsonl");
    let config = MenderConfig {
        store: StoreConfig {
            path: Some(path.clone()),
        },
        ..Default::default()
    };
    let html = r#"<input class="new-email-field" type="email">"#;

    let mut mender = Mender::from_config(config.clone()).await.unwrap();
    let mut driver = HtmlDriver::new(html).with_url("https://example.com/login");
    let action = HealingAction::fill("#email", "user@example.com").with_intent("email");
    assert!(mender.execute(&mut driver, &action).await.unwrap().success);
    drop(mender);

    let mut restarted = Mender::from_config(config).await.unwrap();
    let mut driver = HtmlDriver::new(html).with_url("https://example.com/login");
    let result = restarted
        .resolve(&mut driver, &Intent::input().purpose("email"))
        .await;
    assert_eq!(result.strategy_name.as_deref(), Some("LearnedPattern"));
}
