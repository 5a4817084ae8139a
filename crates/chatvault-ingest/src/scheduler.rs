// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial task queue worker.
//!
//! One worker loop dequeues the oldest pending task, dispatches it to the
//! matching handler, records the terminal state, and publishes
//! `task_completed`. Tasks run strictly one at a time; a failed task is
//! never requeued automatically. An unauthorized source error halts the
//! loop: the current task fails and nothing further is dequeued until the
//! halt is cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatvault_bus::EventBus;
use chatvault_config::model::IngestConfig;
use chatvault_core::types::{TaskRecord, TaskStatus, TaskType};
use chatvault_core::{canonical_chat_id, ChatIdentifier, ChatvaultError, Event, RemoteSource};
use chatvault_storage::queries::{chats, messages, tasks};
use chatvault_storage::Database;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::rate_limit::RateLimiter;
use crate::reconcile::Reconciler;
use crate::retry::RetryPolicy;

/// Idle poll interval when no submit notification arrives.
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Cloneable handle for submitting tasks and inspecting the queue.
#[derive(Clone)]
pub struct QueueHandle {
    db: Database,
    notify: Arc<Notify>,
    halted: Arc<AtomicBool>,
}

impl QueueHandle {
    /// Enqueue a task and wake the worker. Returns the new task id.
    pub async fn submit(
        &self,
        task_type: TaskType,
        chat_id: Option<i64>,
        params: serde_json::Value,
    ) -> Result<String, ChatvaultError> {
        let id = Uuid::new_v4().to_string();
        tasks::enqueue(&self.db, &id, task_type, chat_id, &params).await?;
        self.notify.notify_one();
        debug!(task_id = %id, %task_type, chat_id, "task submitted");
        Ok(id)
    }

    /// Queue size and whether a task is currently being processed.
    pub async fn queue_state(&self) -> Result<(i64, bool), ChatvaultError> {
        let size = tasks::pending_count(&self.db).await?;
        let processing = tasks::is_processing(&self.db).await?;
        Ok((size, processing))
    }

    /// True after an unauthorized source error stopped the worker.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Resume dequeuing after re-authorization.
    pub fn clear_halt(&self) {
        self.halted.store(false, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

pub struct Scheduler {
    db: Database,
    source: Arc<dyn RemoteSource>,
    reconciler: Reconciler,
    bus: EventBus,
    retry: RetryPolicy,
    max_pages: usize,
    notify: Arc<Notify>,
    halted: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        db: Database,
        source: Arc<dyn RemoteSource>,
        limiter: Arc<RateLimiter>,
        bus: EventBus,
        cfg: &IngestConfig,
    ) -> Self {
        let reconciler = Reconciler::new(
            db.clone(),
            Arc::clone(&source),
            limiter,
            bus.clone(),
            cfg.page_size,
        );
        Self {
            db,
            source,
            reconciler,
            bus,
            retry: RetryPolicy::new(
                cfg.retry_max_attempts,
                Duration::from_millis(cfg.retry_base_delay_ms),
            ),
            max_pages: cfg.max_pages_per_task,
            notify: Arc::new(Notify::new()),
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for submitting tasks from other components.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            db: self.db.clone(),
            notify: Arc::clone(&self.notify),
            halted: Arc::clone(&self.halted),
        }
    }

    /// Shared access to the reconciliation engine (live updates).
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run the worker loop until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("scheduler started");
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            if self.halted.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = self.notify.notified() => continue,
                }
            }
            match tasks::dequeue(&self.db).await {
                Ok(Some(task)) => self.process(task).await,
                Ok(None) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep(IDLE_POLL) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "dequeue failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
        info!("scheduler stopped");
    }

    /// Run one task to its terminal state and publish `task_completed`.
    pub async fn process(&self, task: TaskRecord) {
        info!(task_id = %task.id, task_type = %task.task_type, chat_id = task.chat_id, "task started");
        match self.dispatch(&task).await {
            Ok(result) => {
                if let Err(e) = tasks::complete(&self.db, &task.id, result).await {
                    error!(task_id = %task.id, error = %e, "failed to record task completion");
                }
                self.bus.publish(Event::TaskCompleted {
                    task_id: task.id.clone(),
                    task_type: task.task_type,
                    status: TaskStatus::Completed,
                    error: None,
                });
                info!(task_id = %task.id, "task completed");
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.halted.store(true, Ordering::SeqCst);
                    error!(
                        task_id = %task.id,
                        error = %e,
                        "source session unauthorized, halting task processing"
                    );
                }
                let message = e.to_string();
                if let Err(e) = tasks::fail(&self.db, &task.id, &message).await {
                    error!(task_id = %task.id, error = %e, "failed to record task failure");
                }
                self.bus.publish(Event::TaskCompleted {
                    task_id: task.id.clone(),
                    task_type: task.task_type,
                    status: TaskStatus::Failed,
                    error: Some(message.clone()),
                });
                warn!(task_id = %task.id, error = %message, "task failed");
            }
        }
    }

    async fn dispatch(
        &self,
        task: &TaskRecord,
    ) -> Result<Option<serde_json::Value>, ChatvaultError> {
        match task.task_type {
            TaskType::LoadHistory => self.handle_load_history(task).await,
            TaskType::LoadMissed => self.handle_load_missed(task).await,
            TaskType::JoinChat => self.handle_join_chat(task).await,
            TaskType::Export => self.handle_export(task).await,
        }
    }

    async fn handle_load_history(
        &self,
        task: &TaskRecord,
    ) -> Result<Option<serde_json::Value>, ChatvaultError> {
        let chat_id = require_chat_id(task)?;
        let message_limit = task.params.get("limit").and_then(|v| v.as_i64());
        let (new_messages, pages, fully_loaded) =
            self.run_backfill(chat_id, message_limit).await?;
        Ok(Some(serde_json::json!({
            "chat_id": chat_id,
            "new_messages": new_messages,
            "pages": pages,
            "fully_loaded": fully_loaded,
        })))
    }

    async fn handle_load_missed(
        &self,
        task: &TaskRecord,
    ) -> Result<Option<serde_json::Value>, ChatvaultError> {
        let chat_id = require_chat_id(task)?;
        let retry = self.retry;
        let count = retry.run(|| self.reconciler.missed_check(chat_id)).await?;
        self.bus.publish(Event::MissedLoaded { chat_id, count });
        Ok(Some(serde_json::json!({ "chat_id": chat_id, "count": count })))
    }

    async fn handle_join_chat(
        &self,
        task: &TaskRecord,
    ) -> Result<Option<serde_json::Value>, ChatvaultError> {
        let identifier = task
            .params
            .get("identifier")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ChatvaultError::Config("join_chat task requires params.identifier".to_string())
            })?;
        let identifier = ChatIdentifier::parse(identifier)?;

        let retry = self.retry;
        let chat_ref = retry.run(|| self.source.join_chat(&identifier)).await?;
        let chat_id = canonical_chat_id(chat_ref.chat_id, chat_ref.kind);
        chats::upsert_chat(
            &self.db,
            chat_id,
            &chat_ref.title,
            chat_ref.username.as_deref(),
            chat_ref.kind,
        )
        .await?;
        info!(chat_id, title = %chat_ref.title, "joined chat");

        // History load is opt-out.
        let load_history = task
            .params
            .get("load_history")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        let mut new_messages = 0;
        if load_history {
            let limit = task.params.get("limit").and_then(|v| v.as_i64());
            (new_messages, _, _) = self.run_backfill(chat_id, limit).await?;
        }
        Ok(Some(serde_json::json!({
            "chat_id": chat_id,
            "title": chat_ref.title,
            "new_messages": new_messages,
        })))
    }

    async fn handle_export(
        &self,
        task: &TaskRecord,
    ) -> Result<Option<serde_json::Value>, ChatvaultError> {
        let chat_id = require_chat_id(task)?;
        let limit = task
            .params
            .get("limit")
            .and_then(|v| v.as_i64())
            .unwrap_or(1000);
        let records = messages::export_chat(&self.db, chat_id, limit).await?;
        Ok(Some(serde_json::json!({
            "chat_id": chat_id,
            "count": records.len(),
            "messages": records,
        })))
    }

    /// Page backwards until history is exhausted or a budget is hit.
    /// Emits `loading_progress` per page and `chat_loaded` at the end.
    async fn run_backfill(
        &self,
        chat_id: i64,
        message_limit: Option<i64>,
    ) -> Result<(i64, usize, bool), ChatvaultError> {
        let retry = self.retry;
        let mut new_messages = 0i64;
        let mut pages = 0usize;
        let mut fully_loaded = false;
        loop {
            let outcome = retry.run(|| self.reconciler.backfill_page(chat_id)).await?;
            pages += 1;
            new_messages += outcome.inserted;
            fully_loaded = outcome.fully_loaded;
            self.bus.publish(Event::LoadingProgress {
                chat_id,
                loaded: new_messages,
                total: message_limit.unwrap_or(0),
            });
            if fully_loaded || pages >= self.max_pages {
                break;
            }
            if let Some(limit) = message_limit {
                if new_messages >= limit {
                    break;
                }
            }
        }
        self.bus.publish(Event::ChatLoaded {
            chat_id,
            new_messages,
            fully_loaded,
        });
        Ok((new_messages, pages, fully_loaded))
    }
}

fn require_chat_id(task: &TaskRecord) -> Result<i64, ChatvaultError> {
    task.chat_id.ok_or_else(|| {
        ChatvaultError::Config(format!("{} task requires chat_id", task.task_type))
    })
}
