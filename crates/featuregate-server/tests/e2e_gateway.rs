//! End-to-end tests for the gateway HTTP surface
//!
//! These drive the full router with `tower::ServiceExt::oneshot` over the
//! in-memory backend and a recording engine double.
//!
//! ## Test Coverage
//!
//! - Infra lifecycle (create, teardown, read-after-drop failure)
//! - Materialization credential resolution (request fields, session
//!   registry fallback, unauthorized)
//! - Session registration side effects and last-write-wins
//! - Online feature retrieval (transposition, alignment validation,
//!   feature services, full feature names)

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use featuregate_core::{
    encode_entity_key, EntityKey, FeatureRecord, FeatureValue, KeyValue, Materializer, Result,
    StoreBackend, TenantContext,
};
use featuregate_online::MemoryBackend;
use featuregate_server::{app, state::AppState};

/// One recorded materialization job
#[derive(Debug, Clone, PartialEq)]
struct Job {
    project: String,
    user: Option<String>,
    offline_dataset: Option<String>,
    start: Option<NaiveDateTime>,
    end: NaiveDateTime,
    feature_views: Option<Vec<String>>,
}

/// Engine double that records every job it is handed
#[derive(Default)]
struct RecordingEngine {
    jobs: Mutex<Vec<Job>>,
}

#[async_trait]
impl Materializer for RecordingEngine {
    async fn materialize(
        &self,
        ctx: &TenantContext,
        start: NaiveDateTime,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        self.jobs.lock().unwrap().push(Job {
            project: ctx.project.clone(),
            user: ctx.user.clone(),
            offline_dataset: ctx.offline_dataset.clone(),
            start: Some(start),
            end,
            feature_views,
        });
        Ok(())
    }

    async fn materialize_incremental(
        &self,
        ctx: &TenantContext,
        end: NaiveDateTime,
        feature_views: Option<Vec<String>>,
    ) -> Result<()> {
        self.jobs.lock().unwrap().push(Job {
            project: ctx.project.clone(),
            user: ctx.user.clone(),
            offline_dataset: ctx.offline_dataset.clone(),
            start: None,
            end,
            feature_views,
        });
        Ok(())
    }
}

struct TestGateway {
    backend: Arc<MemoryBackend>,
    engine: Arc<RecordingEngine>,
    state: AppState,
}

fn gateway() -> TestGateway {
    gateway_with_services(HashMap::new())
}

fn gateway_with_services(services: HashMap<String, Vec<String>>) -> TestGateway {
    let backend = Arc::new(MemoryBackend::new());
    let engine = Arc::new(RecordingEngine::default());
    let state = AppState::with_components(backend.clone(), engine.clone(), services);
    TestGateway {
        backend,
        engine,
        state,
    }
}

async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json_body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = ServiceExt::<Request<Body>>::oneshot(app(state.clone()), request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = if bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({"raw": true}))
    };
    (status, json)
}

fn ts(secs: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, secs)
        .unwrap()
}

async fn seed_feature(
    backend: &MemoryBackend,
    table: &str,
    key: &EntityKey,
    feature: &str,
    value: FeatureValue,
) {
    backend
        .create_tables(&[table.to_string()])
        .await
        .unwrap();
    backend
        .upsert(
            table,
            FeatureRecord {
                entity_key: encode_entity_key(key).unwrap(),
                feature_name: feature.to_string(),
                value,
                event_ts: ts(0),
                created_ts: None,
            },
        )
        .await
        .unwrap();
}

// ============================================================================
// Ping
// ============================================================================

#[tokio::test]
async fn test_ping() {
    let gw = gateway();
    let (status, body) = send(&gw.state, "GET", "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
}

// ============================================================================
// Infra lifecycle
// ============================================================================

#[tokio::test]
async fn test_infra_update_then_teardown_lifecycle() {
    let gw = gateway();

    // Create the project's table.
    let (status, _) = send(
        &gw.state,
        "POST",
        "/api/v1/infra_update",
        Some(json!({
            "project": "demo",
            "tables_to_keep": ["demo_driver_stats"],
            "tables_to_delete": [],
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(gw.backend.table_names(), vec!["demo_driver_stats".to_string()]);

    // Idempotent: repeating the call succeeds and keeps the table.
    let (status, _) = send(
        &gw.state,
        "POST",
        "/api/v1/infra_update",
        Some(json!({
            "project": "demo",
            "tables_to_keep": ["demo_driver_stats"],
            "tables_to_delete": [],
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Teardown drops it.
    let (status, _) = send(
        &gw.state,
        "DELETE",
        "/api/v1/teardown",
        Some(json!({
            "project": "demo",
            "tables": ["demo_driver_stats"],
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(gw.backend.table_names().is_empty());

    // A read on the dropped table is a backend error, not an empty result.
    let err = gw.backend.read("demo_driver_stats", "abc").await.unwrap_err();
    assert!(matches!(err, featuregate_core::Error::Backend(_)));
}

#[tokio::test]
async fn test_infra_update_rejects_malicious_table_names() {
    let gw = gateway();
    let (status, body) = send(
        &gw.state,
        "POST",
        "/api/v1/infra_update",
        Some(json!({
            "project": "demo",
            "tables_to_keep": ["demo_stats; DROP TABLE users"],
            "tables_to_delete": [],
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(gw.backend.table_names().is_empty());
}

// ============================================================================
// Materialization and credential resolution
// ============================================================================

#[tokio::test]
async fn test_materialize_with_request_credentials() {
    let gw = gateway();
    let (status, _) = send(
        &gw.state,
        "POST",
        "/api/v1/materialize",
        Some(json!({
            "project": "demo",
            "start_date": "2024-03-01T00:00:00",
            "end_date": "2024-03-01T00:00:30",
            "feature_views": ["driver_stats"],
            "user": "alice",
            "offline_dataset": "warehouse",
        })),
        Some("tok-1"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let jobs = gw.engine.jobs.lock().unwrap();
    assert_eq!(
        jobs[0],
        Job {
            project: "demo".to_string(),
            user: Some("alice".to_string()),
            offline_dataset: Some("warehouse".to_string()),
            start: Some(ts(0)),
            end: ts(30),
            feature_views: Some(vec!["driver_stats".to_string()]),
        }
    );

    // Intake registered the session as a side effect.
    let session = gw.state.sessions().get("alice").unwrap();
    assert_eq!(session.project, "demo");
    assert_eq!(session.token, "tok-1");
}

#[tokio::test]
async fn test_materialize_falls_back_to_registered_session() {
    let gw = gateway();

    // First call carries credentials and registers the session.
    send(
        &gw.state,
        "POST",
        "/api/v1/materialize",
        Some(json!({
            "project": "demo",
            "start_date": "2024-03-01T00:00:00",
            "end_date": "2024-03-01T00:00:30",
            "user": "alice",
            "offline_dataset": "warehouse",
            "feature_views": ["driver_stats"],
        })),
        None,
    )
    .await;

    // Second call names no user; credentials resolve from the registry.
    let (status, _) = send(
        &gw.state,
        "POST",
        "/api/v1/materialize_incr",
        Some(json!({
            "project": "demo",
            "end_date": "2024-03-01T00:00:45",
            "feature_views": ["driver_stats"],
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let jobs = gw.engine.jobs.lock().unwrap();
    assert_eq!(jobs[1].user, Some("alice".to_string()));
    assert_eq!(jobs[1].offline_dataset, Some("warehouse".to_string()));
    assert_eq!(jobs[1].start, None);
    assert_eq!(jobs[1].end, ts(45));
}

#[tokio::test]
async fn test_materialize_without_credentials_is_401() {
    let gw = gateway();
    let (status, body) = send(
        &gw.state,
        "POST",
        "/api/v1/materialize",
        Some(json!({
            "project": "ghost",
            "start_date": "2024-03-01T00:00:00",
            "end_date": "2024-03-01T00:00:30",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(gw.engine.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_materialize_rejects_bad_timestamp() {
    let gw = gateway();
    let (status, body) = send(
        &gw.state,
        "POST",
        "/api/v1/materialize",
        Some(json!({
            "project": "demo",
            "start_date": "yesterday",
            "end_date": "2024-03-01T00:00:30",
            "user": "alice",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// ============================================================================
// Session inspection
// ============================================================================

#[tokio::test]
async fn test_registry_dump_and_user_info() {
    let gw = gateway();
    send(
        &gw.state,
        "POST",
        "/api/v1/materialize",
        Some(json!({
            "project": "demo",
            "start_date": "2024-03-01T00:00:00",
            "end_date": "2024-03-01T00:00:30",
            "user": "alice",
            "offline_dataset": "warehouse",
            "feature_views": ["driver_stats"],
        })),
        Some("secret-token"),
    )
    .await;

    let (status, body) = send(&gw.state, "GET", "/api/v1/registry/demo", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "alice");
    assert_eq!(body["offline_dataset"], "warehouse");
    // The credential token never appears in dumps.
    assert!(body.get("token").is_none());

    let (status, body) = send(&gw.state, "GET", "/api/v1/registry/ghost", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = send(&gw.state, "GET", "/api/v1/user_info", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alice"]["project"], "demo");
}

#[tokio::test]
async fn test_session_last_write_wins_across_projects() {
    let gw = gateway();
    for project in ["p1", "p2"] {
        send(
            &gw.state,
            "POST",
            "/api/v1/infra_update",
            Some(json!({
                "project": project,
                "tables_to_keep": [],
                "tables_to_delete": [],
                "user": "u",
            })),
            None,
        )
        .await;
    }

    let (status, _) = send(&gw.state, "GET", "/api/v1/registry/p1", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&gw.state, "GET", "/api/v1/registry/p2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "u");
}

// ============================================================================
// Online feature retrieval
// ============================================================================

#[tokio::test]
async fn test_get_online_features_roundtrip() {
    let gw = gateway();
    let key_1001 = EntityKey::single("driver_id", KeyValue::Int(1001));
    seed_feature(
        &gw.backend,
        "demo_driver_stats",
        &key_1001,
        "rating",
        FeatureValue::Float(4.8),
    )
    .await;

    let (status, body) = send(
        &gw.state,
        "GET",
        "/get-online-features",
        Some(json!({
            "project": "demo",
            "features": ["driver_stats:rating"],
            "entities": {"driver_id": [1001, 9999]},
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["metadata"]["feature_names"]["val"], json!(["rating"]));
    let result = &body["results"][0];
    assert_eq!(result["values"][0], 4.8);
    assert_eq!(result["statuses"][0], "PRESENT");
    assert!(result["event_timestamps"][0].is_string());
    // The unknown entity reads as a miss, in input order.
    assert_eq!(result["values"][1], Value::Null);
    assert_eq!(result["statuses"][1], "NOT_FOUND");
}

#[tokio::test]
async fn test_get_online_features_transposes_columns_in_index_order() {
    let gw = gateway();
    let row1 = EntityKey::new(vec![
        ("a".to_string(), KeyValue::Int(1)),
        ("b".to_string(), KeyValue::Int(10)),
    ]);
    let row2 = EntityKey::new(vec![
        ("a".to_string(), KeyValue::Int(2)),
        ("b".to_string(), KeyValue::Int(20)),
    ]);
    seed_feature(&gw.backend, "demo_pair_stats", &row1, "score", FeatureValue::Int(111)).await;
    seed_feature(&gw.backend, "demo_pair_stats", &row2, "score", FeatureValue::Int(222)).await;

    let (status, body) = send(
        &gw.state,
        "GET",
        "/get-online-features",
        Some(json!({
            "project": "demo",
            "features": ["pair_stats:score"],
            "entities": {"a": [1, 2], "b": [10, 20]},
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["values"], json!([111, 222]));
}

#[tokio::test]
async fn test_get_online_features_rejects_uneven_columns() {
    let gw = gateway();
    let (status, body) = send(
        &gw.state,
        "GET",
        "/get-online-features",
        Some(json!({
            "project": "demo",
            "features": ["driver_stats:rating"],
            "entities": {"a": [1, 2, 3], "b": [4, 5, 6], "c": [7, 8]},
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("uneven entity columns"));
}

#[tokio::test]
async fn test_feature_service_takes_precedence_over_feature_list() {
    let mut services = HashMap::new();
    services.insert(
        "driver_ranking".to_string(),
        vec!["driver_stats:rating".to_string()],
    );
    let gw = gateway_with_services(services);

    let key = EntityKey::single("driver_id", KeyValue::Int(1001));
    seed_feature(
        &gw.backend,
        "demo_driver_stats",
        &key,
        "rating",
        FeatureValue::Float(4.8),
    )
    .await;

    let (status, body) = send(
        &gw.state,
        "GET",
        "/get-online-features",
        Some(json!({
            "project": "demo",
            "feature_service": "driver_ranking",
            "features": ["nonexistent_view:ignored"],
            "full_feature_names": true,
            "entities": {"driver_id": [1001]},
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["metadata"]["feature_names"]["val"],
        json!(["driver_stats__rating"])
    );
}

#[tokio::test]
async fn test_unknown_feature_service_is_validation_error() {
    let gw = gateway();
    let (status, body) = send(
        &gw.state,
        "GET",
        "/get-online-features",
        Some(json!({
            "project": "demo",
            "feature_service": "ghost",
            "entities": {"driver_id": [1]},
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_read_on_missing_table_is_backend_error() {
    let gw = gateway();
    let (status, body) = send(
        &gw.state,
        "GET",
        "/get-online-features",
        Some(json!({
            "project": "demo",
            "features": ["never_created:rating"],
            "entities": {"driver_id": [1]},
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "BACKEND_ERROR");
}
