mod common;

use alertstore_common::types::{AlertState, SaveAlertsOutcome};
use common::{build_test_context, operator};

const SEED: &str = r#"{
    "dashboards": [
        {
            "dashboardId": 10,
            "orgId": 1,
            "alerts": [
                {
                    "panelId": 1,
                    "name": "api latency",
                    "frequency": 60,
                    "for": "5m",
                    "settings": {"alertRuleTags": {"team": "api"}}
                },
                {"panelId": 2, "name": "api errors", "frequency": 30}
            ]
        },
        {
            "dashboardId": 11,
            "orgId": 2,
            "alerts": [{"panelId": 1, "name": "other org", "frequency": 60}]
        }
    ]
}"#;

#[tokio::test]
async fn data_dir_is_created_and_schema_migrated() {
    let ctx = build_test_context(false).await.unwrap();
    assert!(ctx.path("data").is_dir());
    assert!(ctx.state.store.get_all_alerts().await.unwrap().is_empty());
}

#[tokio::test]
async fn seed_file_is_reconciled_idempotently() {
    let ctx = build_test_context(true).await.unwrap();
    let seed_path = ctx.write_file("dashboards.json", SEED).unwrap();

    let first = ctx.state.apply_dashboard_seed(&seed_path).await.unwrap();
    assert_eq!(
        first,
        SaveAlertsOutcome {
            inserted: 3,
            updated: 0,
            unchanged: 0,
            deleted: 0,
        }
    );

    let second = ctx.state.apply_dashboard_seed(&seed_path).await.unwrap();
    assert_eq!(second.unchanged, 3);
    assert_eq!(second.inserted + second.updated + second.deleted, 0);

    let rules = ctx.state.store.get_all_alerts().await.unwrap();
    assert!(rules.iter().all(|r| r.state == AlertState::Unknown));
    let latency = rules.iter().find(|r| r.name == "api latency").unwrap();
    assert_eq!(latency.for_duration.as_secs(), 300);
    let tags = ctx.state.store.get_alert_tags(latency.id).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].key, "team");
}

#[tokio::test]
async fn standalone_flag_controls_search_join() {
    // seeded dashboards have no dashboard rows, so only a left join lists them
    let ctx = build_test_context(true).await.unwrap();
    let seed_path = ctx.write_file("dashboards.json", SEED).unwrap();
    ctx.state.apply_dashboard_seed(&seed_path).await.unwrap();

    let query = ctx.state.search_query(1, operator(1));
    assert!(query.standalone_alerts_enabled);
    let names: Vec<String> = ctx
        .state
        .store
        .search_alerts(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["api errors", "api latency"]);

    let strict = build_test_context(false).await.unwrap();
    let seed_path = strict.write_file("dashboards.json", SEED).unwrap();
    strict.state.apply_dashboard_seed(&seed_path).await.unwrap();
    let query = strict.state.search_query(1, operator(1));
    assert!(strict.state.store.search_alerts(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn pause_all_then_unpause_all() {
    let ctx = build_test_context(true).await.unwrap();
    let seed_path = ctx.write_file("dashboards.json", SEED).unwrap();
    ctx.state.apply_dashboard_seed(&seed_path).await.unwrap();

    assert_eq!(ctx.state.store.pause_all_alerts(true).await.unwrap(), 3);
    let mut query = ctx.state.search_query(1, operator(1));
    query.state = vec!["paused".to_string()];
    assert_eq!(ctx.state.store.search_alerts(&query).await.unwrap().len(), 2);

    assert_eq!(ctx.state.store.pause_all_alerts(false).await.unwrap(), 3);
    assert!(ctx.state.store.search_alerts(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn broken_seed_file_is_reported() {
    let ctx = build_test_context(false).await.unwrap();
    let missing = ctx.path("nope.json").to_string_lossy().to_string();
    let err = ctx.state.apply_dashboard_seed(&missing).await.unwrap_err();
    assert!(err.to_string().contains("Failed to read seed file"));

    let bad = ctx.write_file("bad.json", "{\"dashboards\": [{}]}").unwrap();
    let err = ctx.state.apply_dashboard_seed(&bad).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse seed file"));
}
