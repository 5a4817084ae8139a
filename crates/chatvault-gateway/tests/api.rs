// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST API tests driving the router directly over a temp database.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chatvault_bus::EventBus;
use chatvault_config::model::IngestConfig;
use chatvault_core::types::ChatKind;
use chatvault_core::RemoteSource;
use chatvault_gateway::auth::AuthConfig;
use chatvault_gateway::server::{router, GatewayState};
use chatvault_ingest::{LiveUpdate, RateLimiter, Scheduler};
use chatvault_storage::queries::chats;
use chatvault_storage::Database;
use chatvault_test_utils::{raw_message, MockSource};
use tower::ServiceExt;

const TOKEN: &str = "test-token";
const CHAT: i64 = -1001;

struct Api {
    _dir: tempfile::TempDir,
    db: Database,
    app: Router,
    scheduler: Scheduler,
}

async fn api(api_token: Option<&str>) -> Api {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();

    let source = Arc::new(MockSource::new()) as Arc<dyn RemoteSource>;
    let bus = EventBus::new();
    let cfg = IngestConfig::default();
    let limiter = Arc::new(RateLimiter::new(10_000.0, 100.0));
    let scheduler = Scheduler::new(db.clone(), source, limiter, bus.clone(), &cfg);

    let state = GatewayState {
        db: db.clone(),
        bus,
        queue: scheduler.handle(),
        auth: AuthConfig {
            api_token: api_token.map(str::to_string),
        },
        start_time: Instant::now(),
    };

    Api {
        _dir: dir,
        db,
        app: router(state),
        scheduler,
    }
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed_chat(db: &Database, scheduler: &Scheduler) {
    chats::upsert_chat(db, CHAT, "Rust News", Some("rustnews"), ChatKind::Channel)
        .await
        .unwrap();
    let reconciler = scheduler.reconciler();
    for id in 1..=3 {
        reconciler
            .live_update(CHAT, LiveUpdate::Message(raw_message(id, "hello world")))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn health_needs_no_auth() {
    let api = api(Some(TOKEN)).await;
    let response = api
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_routes_reject_missing_and_wrong_tokens() {
    let api = api(Some(TOKEN)).await;

    let response = api
        .app
        .clone()
        .oneshot(Request::get("/chats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = api
        .app
        .oneshot(
            Request::get("/chats")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn no_configured_token_fails_closed() {
    let api = api(None).await;
    let response = api.app.oneshot(get("/chats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn task_submission_roundtrip() {
    let api = api(Some(TOKEN)).await;

    let request = Request::post("/tasks")
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"type": "load_history", "chat_id": -1001, "params": {"limit": 10}}"#,
        ))
        .unwrap();
    let response = api.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    let task_id = body["task_id"].as_str().unwrap().to_string();

    let response = api
        .app
        .clone()
        .oneshot(get(&format!("/tasks/{task_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task = body_json(response).await;
    assert_eq!(task["status"], "pending");
    assert_eq!(task["chat_id"], -1001);
    assert_eq!(task["params"]["limit"], 10);

    let response = api.app.clone().oneshot(get("/queue")).await.unwrap();
    let queue = body_json(response).await;
    assert_eq!(queue["size"], 1);
    assert_eq!(queue["is_processing"], false);

    let response = api.app.oneshot(get("/tasks/no-such-task")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn message_listing_search_and_single_fetch() {
    let api = api(Some(TOKEN)).await;
    seed_chat(&api.db, &api.scheduler).await;

    let response = api
        .app
        .clone()
        .oneshot(get(&format!("/messages?chat_id={CHAT}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 3);

    let response = api
        .app
        .clone()
        .oneshot(get(&format!("/messages?chat_id={CHAT}&search=hello")))
        .await
        .unwrap();
    let found = body_json(response).await;
    assert_eq!(found.as_array().unwrap().len(), 3);

    let response = api
        .app
        .clone()
        .oneshot(get(&format!("/messages/{CHAT}/2")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let message = body_json(response).await;
    assert_eq!(message["message_id"], 2);
    assert!(message["raw_data"].is_object());

    let response = api
        .app
        .oneshot(get(&format!("/messages/{CHAT}/999")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_listing_and_stats() {
    let api = api(Some(TOKEN)).await;
    seed_chat(&api.db, &api.scheduler).await;
    api.scheduler
        .reconciler()
        .live_update(CHAT, LiveUpdate::Deleted { message_id: 2 })
        .await
        .unwrap();

    let response = api
        .app
        .clone()
        .oneshot(get(&format!("/deleted?chat_id={CHAT}")))
        .await
        .unwrap();
    let deleted = body_json(response).await;
    assert_eq!(deleted.as_array().unwrap().len(), 1);
    assert_eq!(deleted[0]["message_id"], 2);

    let response = api.app.oneshot(get("/stats")).await.unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["total_chats"], 1);
    assert_eq!(stats["total_messages"], 2);
    assert_eq!(stats["total_deleted"], 1);
}

#[tokio::test]
async fn edits_endpoint_returns_history() {
    let api = api(Some(TOKEN)).await;
    seed_chat(&api.db, &api.scheduler).await;
    api.scheduler
        .reconciler()
        .live_update(CHAT, LiveUpdate::Message(raw_message(1, "hello, edited")))
        .await
        .unwrap();

    let response = api
        .app
        .oneshot(get(&format!("/edits/{CHAT}/1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["seq"], 1);
    assert_eq!(history[0]["new_text"], "hello, edited");
}

#[tokio::test]
async fn export_and_purge_endpoints() {
    let api = api(Some(TOKEN)).await;
    seed_chat(&api.db, &api.scheduler).await;

    let response = api
        .app
        .clone()
        .oneshot(get(&format!("/export?chat_id={CHAT}&limit=2")))
        .await
        .unwrap();
    let exported = body_json(response).await;
    assert_eq!(exported.as_array().unwrap().len(), 2);
    assert_eq!(exported[0]["message_id"], 1);

    let request = Request::delete(format!("/chats/{CHAT}/messages"))
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = api.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["deleted"], 3);

    let response = api
        .app
        .oneshot(get(&format!("/messages?chat_id={CHAT}")))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert!(listed.as_array().unwrap().is_empty());
}
