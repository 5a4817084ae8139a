// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation engine: folds fetched remote state into the local store.
//!
//! Three modes share one engine:
//! - backfill: page backwards from the cursor through older history
//! - missed check: fill the gap above `last_seen_message_id`
//! - live update: apply a single pushed message, edit, or deletion
//!
//! Fetched batches are deduplicated by `(chat_id, message_id)` last-wins
//! and malformed entries are skipped with a warning; one bad message never
//! poisons a batch. Events are published only after the store write
//! commits.

use std::collections::HashMap;
use std::sync::Arc;

use chatvault_bus::EventBus;
use chatvault_core::types::RawMessage;
use chatvault_core::{ChatvaultError, Event, RemoteSource};
use chatvault_storage::queries::{chats, messages};
use chatvault_storage::Database;
use tracing::{debug, warn};

use crate::rate_limit::RateLimiter;

/// Result of one backfill page.
#[derive(Debug, Clone, Copy)]
pub struct PageOutcome {
    /// Messages fetched from the source (before dedupe/skip).
    pub fetched: usize,
    /// Rows newly inserted.
    pub inserted: i64,
    /// True when the source returned a short page: history is exhausted.
    pub fully_loaded: bool,
}

/// A single live change pushed from the source.
#[derive(Debug, Clone)]
pub enum LiveUpdate {
    /// A new or edited message (full new state).
    Message(RawMessage),
    /// A deletion of a stored message.
    Deleted { message_id: i64 },
}

pub struct Reconciler {
    db: Database,
    source: Arc<dyn RemoteSource>,
    limiter: Arc<RateLimiter>,
    bus: EventBus,
    page_size: usize,
}

impl Reconciler {
    pub fn new(
        db: Database,
        source: Arc<dyn RemoteSource>,
        limiter: Arc<RateLimiter>,
        bus: EventBus,
        page_size: usize,
    ) -> Self {
        Self {
            db,
            source,
            limiter,
            bus,
            page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch and store one backfill page for `chat_id`.
    ///
    /// The cursor resumes from where the last page left off; a fresh chat
    /// starts at the newest message. The page's rows and the cursor update
    /// commit in one transaction, so a store failure leaves the cursor
    /// untouched and the page is refetched next time.
    pub async fn backfill_page(&self, chat_id: i64) -> Result<PageOutcome, ChatvaultError> {
        let cursor = chats::get_cursor(&self.db, chat_id)
            .await?
            .ok_or(ChatvaultError::ChatNotFound { chat_id })?;

        self.limiter.acquire_one().await;
        let fetched = self
            .source
            .fetch_messages(chat_id, cursor.backfill_cursor, self.page_size)
            .await?;
        let fetched_len = fetched.len();
        let fully_loaded = fetched_len < self.page_size;

        let batch = sanitize_batch(chat_id, fetched);
        let new_cursor = batch.iter().map(|m| m.id).min();

        let inserted =
            messages::apply_backfill_page(&self.db, chat_id, batch, new_cursor, fully_loaded)
                .await?;

        debug!(
            chat_id,
            fetched = fetched_len,
            inserted,
            fully_loaded,
            "backfill page applied"
        );
        Ok(PageOutcome {
            fetched: fetched_len,
            inserted,
            fully_loaded,
        })
    }

    /// Fetch messages newer than `last_seen_message_id` and store the ones
    /// missing locally. Returns the number of gap-filled messages. Chats
    /// that have never seen a message are skipped.
    pub async fn missed_check(&self, chat_id: i64) -> Result<i64, ChatvaultError> {
        let cursor = chats::get_cursor(&self.db, chat_id)
            .await?
            .ok_or(ChatvaultError::ChatNotFound { chat_id })?;
        let Some(last_seen) = cursor.last_seen_message_id else {
            debug!(chat_id, "missed check skipped: no messages observed yet");
            return Ok(0);
        };

        self.limiter.acquire_one().await;
        let fetched = self
            .source
            .fetch_since(chat_id, last_seen, self.page_size)
            .await?;

        let batch: Vec<RawMessage> = sanitize_batch(chat_id, fetched)
            .into_iter()
            .filter(|m| m.id > last_seen)
            .collect();
        let new_last_seen = batch.iter().map(|m| m.id).max().unwrap_or(last_seen);

        let inserted =
            messages::apply_missed_batch(&self.db, chat_id, batch, new_last_seen).await?;

        debug!(chat_id, inserted, new_last_seen, "missed check applied");
        Ok(inserted)
    }

    /// Apply one live update and publish the matching event after commit.
    ///
    /// An unseen key inserts and announces `new_message`. A known key with
    /// changed text or media appends an edit record and announces
    /// `message_edited`; a refetch with identical content is a no-op and
    /// creates no edit record. A deletion tombstones the row.
    pub async fn live_update(
        &self,
        chat_id: i64,
        update: LiveUpdate,
    ) -> Result<(), ChatvaultError> {
        match update {
            LiveUpdate::Message(msg) => {
                if msg.id <= 0 || msg.date.is_empty() {
                    warn!(chat_id, message_id = msg.id, "skipping malformed live message");
                    return Ok(());
                }
                match messages::get_message(&self.db, chat_id, msg.id).await? {
                    None => {
                        let message_id = msg.id;
                        let text = msg.text.clone();
                        let sender_name = msg.sender_name.clone();
                        let message_date = msg.date.clone();
                        messages::insert_live_message(&self.db, chat_id, msg).await?;
                        let chat_title = chats::get_chat(&self.db, chat_id)
                            .await?
                            .map(|c| c.title);
                        self.bus.publish(Event::NewMessage {
                            chat_id,
                            message_id,
                            chat_title,
                            text,
                            sender_name,
                            message_date,
                        });
                    }
                    Some(existing) => {
                        let same_text = existing.text == msg.text;
                        let same_media = existing.media_type
                            == msg.media.as_ref().map(|m| m.media_type.clone())
                            && existing.media_ref
                                == msg.media.as_ref().and_then(|m| m.media_ref.clone());
                        if same_text && same_media {
                            return Ok(());
                        }
                        let message_id = msg.id;
                        let new_text = msg.text.clone();
                        let edit_date = msg.date.clone();
                        messages::record_edit(&self.db, chat_id, msg, edit_date.clone()).await?;
                        self.bus.publish(Event::MessageEdited {
                            chat_id,
                            message_id,
                            new_text,
                            edit_date,
                        });
                    }
                }
            }
            LiveUpdate::Deleted { message_id } => {
                let tombstoned = messages::soft_delete(&self.db, chat_id, message_id).await?;
                if tombstoned {
                    self.bus
                        .publish(Event::MessageDeleted { chat_id, message_id });
                }
            }
        }
        Ok(())
    }
}

/// Drop malformed messages (non-positive id, empty timestamp) with a
/// warning and deduplicate the rest by id, last occurrence winning.
fn sanitize_batch(chat_id: i64, batch: Vec<RawMessage>) -> Vec<RawMessage> {
    let mut by_id: HashMap<i64, RawMessage> = HashMap::with_capacity(batch.len());
    for msg in batch {
        if msg.id <= 0 || msg.date.is_empty() {
            warn!(chat_id, message_id = msg.id, "skipping malformed message in batch");
            continue;
        }
        by_id.insert(msg.id, msg);
    }
    by_id.into_values().collect()
}
