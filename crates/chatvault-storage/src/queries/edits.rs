// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the append-only edit history and deletion tombstones.

use chatvault_core::ChatvaultError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{EditRecord, MessageRecord};

/// List the edit history for one message, oldest first.
pub async fn list_edits(
    db: &Database,
    chat_id: i64,
    message_id: i64,
) -> Result<Vec<EditRecord>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, message_id, seq, old_text, new_text, edit_date
                 FROM message_edits WHERE chat_id = ?1 AND message_id = ?2
                 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![chat_id, message_id], |row| {
                Ok(EditRecord {
                    chat_id: row.get(0)?,
                    message_id: row.get(1)?,
                    seq: row.get(2)?,
                    old_text: row.get(3)?,
                    new_text: row.get(4)?,
                    edit_date: row.get(5)?,
                })
            })?;
            let mut edits = Vec::new();
            for row in rows {
                edits.push(row?);
            }
            Ok(edits)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List tombstoned messages, most recently deleted first, optionally
/// restricted to one chat.
pub async fn list_deleted(
    db: &Database,
    chat_id: Option<i64>,
    limit: i64,
) -> Result<Vec<MessageRecord>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match chat_id {
                Some(chat_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT chat_id, message_id, sender_id, sender_name, text, message_date,
                                media_type, media_ref, views, edit_count, is_deleted, deleted_at, saved_at
                         FROM messages WHERE is_deleted = 1 AND chat_id = ?1
                         ORDER BY deleted_at DESC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(
                        params![chat_id, limit],
                        crate::queries::messages::row_to_message,
                    )?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT chat_id, message_id, sender_id, sender_name, text, message_date,
                                media_type, media_ref, views, edit_count, is_deleted, deleted_at, saved_at
                         FROM messages WHERE is_deleted = 1
                         ORDER BY deleted_at DESC LIMIT ?1",
                    )?;
                    let rows = stmt
                        .query_map(params![limit], crate::queries::messages::row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
