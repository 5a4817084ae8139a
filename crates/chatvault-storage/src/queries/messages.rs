// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message write and read operations.
//!
//! Batch writers (`apply_backfill_page`, `apply_missed_batch`) commit their
//! message rows together with the chat cursor update in a single
//! transaction: either every row lands and the cursor moves, or nothing
//! changes.

use chatvault_core::types::RawMessage;
use chatvault_core::ChatvaultError;
use rusqlite::params;

use crate::database::Database;
use crate::models::MessageRecord;

/// Filters for [`get_messages`].
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub chat_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
    pub search: Option<String>,
    pub include_deleted: bool,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            chat_id: None,
            limit: 100,
            offset: 0,
            search: None,
            include_deleted: false,
        }
    }
}

/// Store one backfill page: insert its messages and advance the cursor in
/// one transaction. `new_cursor` is the oldest message id of the batch
/// (`None` keeps the current cursor, for empty pages). Returns the number
/// of newly inserted rows; rows already present are left untouched.
pub async fn apply_backfill_page(
    db: &Database,
    chat_id: i64,
    messages: Vec<RawMessage>,
    new_cursor: Option<i64>,
    fully_loaded: bool,
) -> Result<i64, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = insert_batch(&tx, chat_id, &messages)?;
            let newest_id = messages.iter().map(|m| m.id).max();
            let changed = tx.execute(
                "UPDATE chats SET
                     backfill_cursor = COALESCE(?2, backfill_cursor),
                     fully_loaded = ?3,
                     total_loaded = total_loaded + ?4,
                     last_seen_message_id = MAX(COALESCE(last_seen_message_id, 0), COALESCE(?5, 0)),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE chat_id = ?1",
                params![chat_id, new_cursor, fully_loaded, inserted, newest_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            tx.commit()?;
            Ok(Some(inserted))
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or(ChatvaultError::ChatNotFound { chat_id })
}

/// Store a missed-check batch: insert gap-filled messages and advance
/// `last_seen_message_id` in one transaction. Returns the number of newly
/// inserted rows.
pub async fn apply_missed_batch(
    db: &Database,
    chat_id: i64,
    messages: Vec<RawMessage>,
    new_last_seen: i64,
) -> Result<i64, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = insert_batch(&tx, chat_id, &messages)?;
            let changed = tx.execute(
                "UPDATE chats SET
                     total_loaded = total_loaded + ?2,
                     last_seen_message_id = MAX(COALESCE(last_seen_message_id, 0), ?3),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE chat_id = ?1",
                params![chat_id, inserted, new_last_seen],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            tx.commit()?;
            Ok(Some(inserted))
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or(ChatvaultError::ChatNotFound { chat_id })
}

/// Store a single live message. Returns `true` if the row was new,
/// `false` if the key already existed.
pub async fn insert_live_message(
    db: &Database,
    chat_id: i64,
    message: RawMessage,
) -> Result<bool, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = insert_batch(&tx, chat_id, std::slice::from_ref(&message))?;
            if inserted > 0 {
                tx.execute(
                    "UPDATE chats SET
                         total_loaded = total_loaded + 1,
                         last_seen_message_id = MAX(COALESCE(last_seen_message_id, 0), ?2),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE chat_id = ?1",
                    params![chat_id, message.id],
                )?;
            }
            tx.commit()?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply an edit: append an edit record with the next seq, then overwrite
/// the message content with the new state. Returns the assigned seq.
pub async fn record_edit(
    db: &Database,
    chat_id: i64,
    message: RawMessage,
    edit_date: String,
) -> Result<i64, ChatvaultError> {
    let message_id = message.id;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = tx.query_row(
                "SELECT text, edit_count FROM messages WHERE chat_id = ?1 AND message_id = ?2",
                params![chat_id, message.id],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)),
            );
            let (old_text, edit_count) = match existing {
                Ok(found) => found,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let seq = edit_count + 1;
            tx.execute(
                "INSERT INTO message_edits (chat_id, message_id, seq, old_text, new_text, edit_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![chat_id, message.id, seq, old_text, message.text, edit_date],
            )?;
            let raw = serialize_raw(&message)?;
            tx.execute(
                "UPDATE messages SET
                     text = ?3, media_type = ?4, media_ref = ?5, views = ?6,
                     raw_data = ?7, edit_count = ?8
                 WHERE chat_id = ?1 AND message_id = ?2",
                params![
                    chat_id,
                    message.id,
                    message.text,
                    message.media.as_ref().map(|m| m.media_type.clone()),
                    message.media.as_ref().and_then(|m| m.media_ref.clone()),
                    message.views,
                    raw,
                    seq,
                ],
            )?;
            tx.commit()?;
            Ok(Some(seq))
        })
        .await
        .map_err(crate::database::map_tr_err)?
        .ok_or_else(|| {
            ChatvaultError::Internal(format!(
                "edit target missing: chat {chat_id} message {message_id}"
            ))
        })
}

/// Tombstone a message and append a `deleted` audit event. Returns `true`
/// if the message was tombstoned now, `false` if it was already deleted or
/// never stored. Re-deleting keeps the original tombstone timestamp.
pub async fn soft_delete(
    db: &Database,
    chat_id: i64,
    message_id: i64,
) -> Result<bool, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE messages SET is_deleted = 1,
                     deleted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE chat_id = ?1 AND message_id = ?2 AND is_deleted = 0",
                params![chat_id, message_id],
            )?;
            if changed > 0 {
                tx.execute(
                    "INSERT INTO message_events (chat_id, message_id, event_type, event_date)
                     VALUES (?1, ?2, 'deleted', strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                    params![chat_id, message_id],
                )?;
            }
            tx.commit()?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Query messages, newest first. Tombstoned rows are excluded unless
/// `include_deleted` is set. `search` does a case-insensitive substring
/// match on the text.
pub async fn get_messages(
    db: &Database,
    query: MessageQuery,
) -> Result<Vec<MessageRecord>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let mut sql = String::from(
                "SELECT chat_id, message_id, sender_id, sender_name, text, message_date,
                        media_type, media_ref, views, edit_count, is_deleted, deleted_at, saved_at
                 FROM messages",
            );
            let mut clauses: Vec<String> = Vec::new();
            let mut values: Vec<rusqlite::types::Value> = Vec::new();

            if let Some(chat_id) = query.chat_id {
                values.push(chat_id.into());
                clauses.push(format!("chat_id = ?{}", values.len()));
            }
            if let Some(search) = &query.search {
                values.push(format!("%{}%", escape_like(search)).into());
                clauses.push(format!("text LIKE ?{} ESCAPE '\\'", values.len()));
            }
            if !query.include_deleted {
                clauses.push("is_deleted = 0".to_string());
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            values.push(query.limit.into());
            sql.push_str(&format!(
                " ORDER BY message_date DESC, message_id DESC LIMIT ?{}",
                values.len()
            ));
            values.push(query.offset.into());
            sql.push_str(&format!(" OFFSET ?{}", values.len()));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values), row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a single message including its raw snapshot.
pub async fn get_message(
    db: &Database,
    chat_id: i64,
    message_id: i64,
) -> Result<Option<MessageRecord>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT chat_id, message_id, sender_id, sender_name, text, message_date,
                        media_type, media_ref, views, edit_count, is_deleted, deleted_at,
                        saved_at, raw_data
                 FROM messages WHERE chat_id = ?1 AND message_id = ?2",
                params![chat_id, message_id],
                row_to_message_with_raw,
            );
            match result {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Of the given candidate message ids, return those not stored for the
/// chat, preserving input order.
pub async fn list_missing(
    db: &Database,
    chat_id: i64,
    candidate_ids: Vec<i64>,
) -> Result<Vec<i64>, ChatvaultError> {
    if candidate_ids.is_empty() {
        return Ok(Vec::new());
    }
    db.connection()
        .call(move |conn| {
            let placeholders = (2..=candidate_ids.len() + 1)
                .map(|n| format!("?{n}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT message_id FROM messages
                 WHERE chat_id = ?1 AND message_id IN ({placeholders})"
            );
            let mut values: Vec<rusqlite::types::Value> = vec![chat_id.into()];
            values.extend(candidate_ids.iter().map(|&id| id.into()));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values), |row| {
                row.get::<_, i64>(0)
            })?;
            let mut present = std::collections::HashSet::new();
            for row in rows {
                present.insert(row?);
            }
            Ok(candidate_ids
                .into_iter()
                .filter(|id| !present.contains(id))
                .collect())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Materialize a bounded export of one chat, oldest first, raw snapshots
/// included.
pub async fn export_chat(
    db: &Database,
    chat_id: i64,
    limit: i64,
) -> Result<Vec<MessageRecord>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, message_id, sender_id, sender_name, text, message_date,
                        media_type, media_ref, views, edit_count, is_deleted, deleted_at,
                        saved_at, raw_data
                 FROM messages WHERE chat_id = ?1 AND is_deleted = 0
                 ORDER BY message_id ASC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![chat_id, limit], row_to_message_with_raw)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert messages with INSERT OR IGNORE, returning how many were new.
fn insert_batch(
    tx: &rusqlite::Transaction<'_>,
    chat_id: i64,
    messages: &[RawMessage],
) -> Result<i64, tokio_rusqlite::Error> {
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO messages
             (chat_id, message_id, sender_id, sender_name, text, message_date,
              media_type, media_ref, views, raw_data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    let mut inserted = 0i64;
    for msg in messages {
        let raw = serialize_raw(msg)?;
        inserted += stmt.execute(params![
            chat_id,
            msg.id,
            msg.sender_id,
            msg.sender_name,
            msg.text,
            msg.date,
            msg.media.as_ref().map(|m| m.media_type.clone()),
            msg.media.as_ref().and_then(|m| m.media_ref.clone()),
            msg.views,
            raw,
        ])? as i64;
    }
    Ok(inserted)
}

fn serialize_raw(msg: &RawMessage) -> Result<String, rusqlite::Error> {
    serde_json::to_string(&msg.raw)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Escape LIKE wildcards in a user-supplied search term.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        chat_id: row.get(0)?,
        message_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_name: row.get(3)?,
        text: row.get(4)?,
        message_date: row.get(5)?,
        media_type: row.get(6)?,
        media_ref: row.get(7)?,
        views: row.get(8)?,
        edit_count: row.get(9)?,
        raw_data: None,
        is_deleted: row.get(10)?,
        deleted_at: row.get(11)?,
        saved_at: row.get(12)?,
    })
}

fn row_to_message_with_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    let mut msg = row_to_message(row)?;
    let raw: Option<String> = row.get(13)?;
    msg.raw_data = match raw {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                13,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?),
        None => None,
    };
    Ok(msg)
}
