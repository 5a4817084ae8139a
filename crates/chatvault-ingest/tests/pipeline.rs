// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end ingestion tests: scheduler, reconciler, and store driven by
//! a scripted mock source over a temp SQLite database.

use std::sync::Arc;
use std::time::Duration;

use chatvault_bus::EventBus;
use chatvault_config::model::IngestConfig;
use chatvault_core::types::{ChatKind, TaskStatus, TaskType};
use chatvault_core::{ChatvaultError, Event, RemoteSource};
use chatvault_ingest::{LiveUpdate, RateLimiter, Scheduler};
use chatvault_storage::queries::messages::MessageQuery;
use chatvault_storage::queries::{chats, edits, messages, tasks};
use chatvault_storage::Database;
use chatvault_test_utils::{raw_message, MockSource};
use tokio_util::sync::CancellationToken;

const CHAT: i64 = -1001;

struct Harness {
    _dir: tempfile::TempDir,
    db: Database,
    source: Arc<MockSource>,
    scheduler: Scheduler,
    bus: EventBus,
}

async fn harness(page_size: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();

    let source = Arc::new(MockSource::new());
    let bus = EventBus::new();
    let cfg = IngestConfig {
        requests_per_second: 10_000.0,
        burst: 100.0,
        page_size,
        max_pages_per_task: 10,
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
        ..Default::default()
    };
    let limiter = Arc::new(RateLimiter::new(cfg.requests_per_second, cfg.burst));
    let scheduler = Scheduler::new(
        db.clone(),
        source.clone() as Arc<dyn RemoteSource>,
        limiter,
        bus.clone(),
        &cfg,
    );

    Harness {
        _dir: dir,
        db,
        source,
        scheduler,
        bus,
    }
}

/// Submit a task and run it to its terminal state on the calling task.
async fn run_task(
    h: &Harness,
    task_type: TaskType,
    chat_id: Option<i64>,
    params: serde_json::Value,
) -> chatvault_core::types::TaskRecord {
    let id = h
        .scheduler
        .handle()
        .submit(task_type, chat_id, params)
        .await
        .unwrap();
    let task = tasks::dequeue(&h.db).await.unwrap().expect("task queued");
    assert_eq!(task.id, id);
    h.scheduler.process(task).await;
    tasks::get_task(&h.db, &id).await.unwrap().unwrap()
}

async fn stored_count(db: &Database, chat_id: i64) -> usize {
    messages::get_messages(
        db,
        MessageQuery {
            chat_id: Some(chat_id),
            limit: 10_000,
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .len()
}

#[tokio::test]
async fn backfill_archives_full_history_in_pages() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", Some("rustnews"), ChatKind::Channel)
        .await
        .unwrap();
    h.source
        .seed_messages(CHAT, (1..=120).map(|id| raw_message(id, "msg")).collect())
        .await;

    let mut events = h.bus.subscribe();
    let task = run_task(&h, TaskType::LoadHistory, Some(CHAT), serde_json::json!({})).await;

    assert_eq!(task.status, TaskStatus::Completed);
    let result = task.result.unwrap();
    assert_eq!(result["new_messages"], 120);
    assert_eq!(result["fully_loaded"], true);

    assert_eq!(stored_count(&h.db, CHAT).await, 120);
    // 120 messages at page size 50: two full pages plus the short third.
    assert_eq!(h.source.fetch_calls().await, 3);

    let cursor = chats::get_cursor(&h.db, CHAT).await.unwrap().unwrap();
    assert!(cursor.fully_loaded);
    assert_eq!(cursor.backfill_cursor, Some(1));
    assert_eq!(cursor.last_seen_message_id, Some(120));

    // Per-page progress, then the summary, then the task terminal event.
    let mut progress = 0;
    let mut loaded = false;
    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::LoadingProgress { chat_id, .. } => {
                assert_eq!(chat_id, CHAT);
                progress += 1;
            }
            Event::ChatLoaded {
                chat_id,
                new_messages,
                fully_loaded,
            } => {
                assert_eq!(chat_id, CHAT);
                assert_eq!(new_messages, 120);
                assert!(fully_loaded);
                loaded = true;
            }
            Event::TaskCompleted { status, .. } => {
                assert_eq!(status, TaskStatus::Completed);
                completed = true;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(progress, 3);
    assert!(loaded);
    assert!(completed);
}

#[tokio::test]
async fn backfill_rerun_is_idempotent() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    h.source
        .seed_messages(CHAT, (1..=60).map(|id| raw_message(id, "msg")).collect())
        .await;

    let first = run_task(&h, TaskType::LoadHistory, Some(CHAT), serde_json::json!({})).await;
    assert_eq!(first.result.unwrap()["new_messages"], 60);

    let second = run_task(&h, TaskType::LoadHistory, Some(CHAT), serde_json::json!({})).await;
    assert_eq!(second.status, TaskStatus::Completed);
    assert_eq!(second.result.unwrap()["new_messages"], 0);
    assert_eq!(stored_count(&h.db, CHAT).await, 60);
}

#[tokio::test]
async fn backfill_respects_message_limit_param() {
    let h = harness(10).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    h.source
        .seed_messages(CHAT, (1..=100).map(|id| raw_message(id, "msg")).collect())
        .await;

    let task = run_task(
        &h,
        TaskType::LoadHistory,
        Some(CHAT),
        serde_json::json!({"limit": 25}),
    )
    .await;

    assert_eq!(task.status, TaskStatus::Completed);
    let result = task.result.unwrap();
    // Whole pages only: the limit is hit after the third page of ten.
    assert_eq!(result["new_messages"], 30);
    assert_eq!(result["fully_loaded"], false);
}

#[tokio::test]
async fn load_history_for_unknown_chat_fails() {
    let h = harness(50).await;
    let task = run_task(&h, TaskType::LoadHistory, Some(-404), serde_json::json!({})).await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.unwrap().contains("-404"));
}

#[tokio::test]
async fn missed_check_fills_the_gap_once() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    h.source
        .seed_messages(CHAT, (1..=100).map(|id| raw_message(id, "msg")).collect())
        .await;
    run_task(&h, TaskType::LoadHistory, Some(CHAT), serde_json::json!({})).await;

    // Five messages arrive while we were not watching.
    h.source
        .seed_messages(CHAT, (101..=105).map(|id| raw_message(id, "late")).collect())
        .await;

    let mut events = h.bus.subscribe();
    let task = run_task(&h, TaskType::LoadMissed, Some(CHAT), serde_json::json!({})).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result.unwrap()["count"], 5);
    assert_eq!(stored_count(&h.db, CHAT).await, 105);

    let cursor = chats::get_cursor(&h.db, CHAT).await.unwrap().unwrap();
    assert_eq!(cursor.last_seen_message_id, Some(105));

    let mut missed_events = 0;
    while let Ok(event) = events.try_recv() {
        if let Event::MissedLoaded { chat_id, count } = event {
            assert_eq!(chat_id, CHAT);
            assert_eq!(count, 5);
            missed_events += 1;
        }
    }
    assert_eq!(missed_events, 1);

    // A second sweep finds nothing new.
    let task = run_task(&h, TaskType::LoadMissed, Some(CHAT), serde_json::json!({})).await;
    assert_eq!(task.result.unwrap()["count"], 0);
    assert_eq!(stored_count(&h.db, CHAT).await, 105);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    h.source
        .seed_messages(CHAT, (1..=10).map(|id| raw_message(id, "msg")).collect())
        .await;
    h.source
        .inject_error(ChatvaultError::transient("rate limited upstream"))
        .await;

    let task = run_task(&h, TaskType::LoadHistory, Some(CHAT), serde_json::json!({})).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(stored_count(&h.db, CHAT).await, 10);
}

#[tokio::test]
async fn unauthorized_halts_the_queue_until_cleared() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    h.source
        .seed_messages(CHAT, (1..=10).map(|id| raw_message(id, "msg")).collect())
        .await;
    h.source
        .inject_error(ChatvaultError::unauthorized("session revoked"))
        .await;

    let handle = h.scheduler.handle();
    let mut events = h.bus.subscribe();
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(h.scheduler.run(cancel.clone()));

    let failed_id = handle
        .submit(TaskType::LoadHistory, Some(CHAT), serde_json::json!({}))
        .await
        .unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        Event::TaskCompleted { task_id, status, .. } => {
            assert_eq!(task_id, failed_id);
            assert_eq!(status, TaskStatus::Failed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(handle.is_halted());

    // Nothing is dequeued while halted.
    let queued_id = handle
        .submit(TaskType::LoadHistory, Some(CHAT), serde_json::json!({}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let queued = tasks::get_task(&h.db, &queued_id).await.unwrap().unwrap();
    assert_eq!(queued.status, TaskStatus::Pending);

    // Clearing the halt resumes with the queued task.
    handle.clear_halt();
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        Event::TaskCompleted { task_id, status, .. } => {
            assert_eq!(task_id, queued_id);
            assert_eq!(status, TaskStatus::Completed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!handle.is_halted());

    cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn join_chat_canonicalizes_and_backfills() {
    let h = harness(50).await;
    h.source.add_channel(123, "Rust News", Some("rustnews")).await;
    // The adapter is keyed by canonical ids.
    let canonical = -(1_000_000_000_000 + 123);
    h.source
        .seed_messages(canonical, (1..=5).map(|id| raw_message(id, "msg")).collect())
        .await;

    let task = run_task(
        &h,
        TaskType::JoinChat,
        None,
        serde_json::json!({"identifier": "@rustnews"}),
    )
    .await;

    assert_eq!(task.status, TaskStatus::Completed);
    let result = task.result.unwrap();
    assert_eq!(result["chat_id"], canonical);
    assert_eq!(result["new_messages"], 5);

    let chat = chats::get_chat(&h.db, canonical).await.unwrap().unwrap();
    assert_eq!(chat.title, "Rust News");
    assert_eq!(chat.kind, ChatKind::Channel);
}

#[tokio::test]
async fn join_chat_can_skip_history_load() {
    let h = harness(50).await;
    h.source.add_channel(123, "Rust News", Some("rustnews")).await;

    let task = run_task(
        &h,
        TaskType::JoinChat,
        None,
        serde_json::json!({"identifier": "@rustnews", "load_history": false}),
    )
    .await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result.unwrap()["new_messages"], 0);
    assert_eq!(h.source.fetch_calls().await, 0);
}

#[tokio::test]
async fn export_task_embeds_messages_in_result() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    h.source
        .seed_messages(CHAT, (1..=8).map(|id| raw_message(id, "msg")).collect())
        .await;
    run_task(&h, TaskType::LoadHistory, Some(CHAT), serde_json::json!({})).await;

    let task = run_task(
        &h,
        TaskType::Export,
        Some(CHAT),
        serde_json::json!({"limit": 5}),
    )
    .await;

    assert_eq!(task.status, TaskStatus::Completed);
    let result = task.result.unwrap();
    assert_eq!(result["count"], 5);
    let exported = result["messages"].as_array().unwrap();
    assert_eq!(exported.len(), 5);
    // Oldest first, raw snapshot included.
    assert_eq!(exported[0]["message_id"], 1);
    assert!(exported[0]["raw_data"].is_object());
}

#[tokio::test]
async fn live_edit_records_history_and_noop_refetch_does_not() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();

    let reconciler = h.scheduler.reconciler();
    let mut events = h.bus.subscribe();

    reconciler
        .live_update(CHAT, LiveUpdate::Message(raw_message(1, "original")))
        .await
        .unwrap();
    assert!(matches!(
        events.try_recv().unwrap(),
        Event::NewMessage { message_id: 1, .. }
    ));

    // Refetch with identical content: no edit record, no event.
    reconciler
        .live_update(CHAT, LiveUpdate::Message(raw_message(1, "original")))
        .await
        .unwrap();
    assert!(events.try_recv().is_err());
    assert!(edits::list_edits(&h.db, CHAT, 1).await.unwrap().is_empty());

    // Changed text: edit record seq 1, message overwritten, event fired.
    reconciler
        .live_update(CHAT, LiveUpdate::Message(raw_message(1, "edited")))
        .await
        .unwrap();
    let history = edits::list_edits(&h.db, CHAT, 1).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].seq, 1);
    assert_eq!(history[0].old_text.as_deref(), Some("original"));
    assert_eq!(history[0].new_text.as_deref(), Some("edited"));

    let stored = messages::get_message(&h.db, CHAT, 1).await.unwrap().unwrap();
    assert_eq!(stored.text.as_deref(), Some("edited"));
    assert!(matches!(
        events.try_recv().unwrap(),
        Event::MessageEdited { message_id: 1, .. }
    ));
}

#[tokio::test]
async fn live_delete_tombstones_exactly_once() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    let reconciler = h.scheduler.reconciler();
    reconciler
        .live_update(CHAT, LiveUpdate::Message(raw_message(1, "soon gone")))
        .await
        .unwrap();

    let mut events = h.bus.subscribe();
    reconciler
        .live_update(CHAT, LiveUpdate::Deleted { message_id: 1 })
        .await
        .unwrap();
    assert!(matches!(
        events.try_recv().unwrap(),
        Event::MessageDeleted { message_id: 1, .. }
    ));

    // Default listing hides the tombstone; include_deleted shows it.
    assert_eq!(stored_count(&h.db, CHAT).await, 0);
    let with_deleted = messages::get_messages(
        &h.db,
        MessageQuery {
            chat_id: Some(CHAT),
            include_deleted: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(with_deleted.len(), 1);
    assert!(with_deleted[0].is_deleted);

    // Repeat delete: no second event.
    reconciler
        .live_update(CHAT, LiveUpdate::Deleted { message_id: 1 })
        .await
        .unwrap();
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn malformed_messages_are_skipped_not_fatal() {
    let h = harness(50).await;
    chats::upsert_chat(&h.db, CHAT, "Rust News", None, ChatKind::Channel)
        .await
        .unwrap();
    let mut batch: Vec<_> = (1..=5).map(|id| raw_message(id, "msg")).collect();
    batch.push(raw_message(-7, "bad id"));
    let mut no_date = raw_message(6, "no date");
    no_date.date = String::new();
    batch.push(no_date);
    h.source.seed_messages(CHAT, batch).await;

    let task = run_task(&h, TaskType::LoadHistory, Some(CHAT), serde_json::json!({})).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(stored_count(&h.db, CHAT).await, 5);
}
