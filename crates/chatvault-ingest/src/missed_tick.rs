// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic producer that enqueues `load_missed` tasks.
//!
//! Every tick it walks the known chats that have observed at least one
//! message and submits a missed-check task for each, bounded per pass and
//! skipping chats that already have one queued. Feeding the regular queue
//! keeps ordering and halting semantics in one place.

use std::time::Duration;

use chatvault_core::types::TaskType;
use chatvault_storage::queries::{chats, tasks};
use chatvault_storage::Database;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::scheduler::QueueHandle;

pub async fn run_missed_tick(
    db: Database,
    handle: QueueHandle,
    interval: Duration,
    chat_limit: usize,
    shutdown: CancellationToken,
) {
    if interval.is_zero() {
        debug!("missed tick disabled");
        return;
    }
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval fires immediately; skip the startup tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if handle.is_halted() {
            continue;
        }
        sweep(&db, &handle, chat_limit).await;
    }
    debug!("missed tick stopped");
}

async fn sweep(db: &Database, handle: &QueueHandle, chat_limit: usize) {
    let chat_list = match chats::list_chats(db).await {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "missed sweep could not list chats");
            return;
        }
    };

    let mut enqueued = 0usize;
    for chat in chat_list {
        if enqueued >= chat_limit {
            break;
        }
        if chat.last_seen_message_id.is_none() {
            continue;
        }
        match tasks::has_active_task(db, chat.chat_id, TaskType::LoadMissed).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                warn!(chat_id = chat.chat_id, error = %e, "missed sweep lookup failed");
                continue;
            }
        }
        match handle
            .submit(TaskType::LoadMissed, Some(chat.chat_id), serde_json::json!({}))
            .await
        {
            Ok(_) => enqueued += 1,
            Err(e) => warn!(chat_id = chat.chat_id, error = %e, "missed sweep submit failed"),
        }
    }
    debug!(enqueued, "missed sweep finished");
}
