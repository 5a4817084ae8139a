// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat row operations: upsert, lookup, cursor state, purge.

use chatvault_core::ChatvaultError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{ChatKind, ChatRecord};

/// Backfill cursor state for one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    /// Oldest message id fetched so far. `None` = backfill never ran.
    pub backfill_cursor: Option<i64>,
    pub fully_loaded: bool,
    pub last_seen_message_id: Option<i64>,
}

/// Insert or refresh a chat row. Cursor state is never touched here.
pub async fn upsert_chat(
    db: &Database,
    chat_id: i64,
    title: &str,
    username: Option<&str>,
    kind: ChatKind,
) -> Result<(), ChatvaultError> {
    let title = title.to_string();
    let username = username.map(str::to_string);
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chats (chat_id, title, username, kind) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(chat_id) DO UPDATE SET
                     title = excluded.title,
                     username = excluded.username,
                     kind = excluded.kind,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![chat_id, title, username, kind],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a single chat row.
pub async fn get_chat(db: &Database, chat_id: i64) -> Result<Option<ChatRecord>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, title, username, kind, backfill_cursor, fully_loaded,
                        last_seen_message_id, total_loaded, created_at, updated_at
                 FROM chats WHERE chat_id = ?1",
            )?;
            let result = stmt.query_row(params![chat_id], row_to_chat);
            match result {
                Ok(chat) => Ok(Some(chat)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all chats, most recently updated first.
pub async fn list_chats(db: &Database) -> Result<Vec<ChatRecord>, ChatvaultError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, title, username, kind, backfill_cursor, fully_loaded,
                        last_seen_message_id, total_loaded, created_at, updated_at
                 FROM chats ORDER BY updated_at DESC",
            )?;
            let rows = stmt.query_map([], row_to_chat)?;
            let mut chats = Vec::new();
            for row in rows {
                chats.push(row?);
            }
            Ok(chats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Read the backfill cursor state for a chat.
pub async fn get_cursor(
    db: &Database,
    chat_id: i64,
) -> Result<Option<CursorState>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT backfill_cursor, fully_loaded, last_seen_message_id
                 FROM chats WHERE chat_id = ?1",
                params![chat_id],
                |row| {
                    Ok(CursorState {
                        backfill_cursor: row.get(0)?,
                        fully_loaded: row.get(1)?,
                        last_seen_message_id: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(state) => Ok(Some(state)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Purge all messages, edits, and events for one chat and reset its cursor
/// state. The chat row itself is kept. Returns the number of deleted
/// messages.
pub async fn clear_chat(db: &Database, chat_id: i64) -> Result<i64, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let deleted =
                tx.execute("DELETE FROM messages WHERE chat_id = ?1", params![chat_id])? as i64;
            tx.execute(
                "DELETE FROM message_edits WHERE chat_id = ?1",
                params![chat_id],
            )?;
            tx.execute(
                "DELETE FROM message_events WHERE chat_id = ?1",
                params![chat_id],
            )?;
            tx.execute(
                "UPDATE chats SET backfill_cursor = NULL, fully_loaded = 0,
                 last_seen_message_id = NULL, total_loaded = 0,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE chat_id = ?1",
                params![chat_id],
            )?;
            tx.commit()?;
            Ok(deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Purge every message, edit, and event and reset all chat cursors.
/// Returns the number of deleted messages.
pub async fn clear_all(db: &Database) -> Result<i64, ChatvaultError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute("DELETE FROM messages", [])? as i64;
            tx.execute("DELETE FROM message_edits", [])?;
            tx.execute("DELETE FROM message_events", [])?;
            tx.execute(
                "UPDATE chats SET backfill_cursor = NULL, fully_loaded = 0,
                 last_seen_message_id = NULL, total_loaded = 0,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )?;
            tx.commit()?;
            Ok(deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub(crate) fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRecord> {
    let kind: String = row.get(3)?;
    let kind = kind.parse::<ChatKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ChatRecord {
        chat_id: row.get(0)?,
        title: row.get(1)?,
        username: row.get(2)?,
        kind,
        backfill_cursor: row.get(4)?,
        fully_loaded: row.get(5)?,
        last_seen_message_id: row.get(6)?,
        total_loaded: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
