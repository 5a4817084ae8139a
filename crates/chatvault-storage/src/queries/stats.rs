// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate archive statistics.

use chatvault_core::ChatvaultError;

use crate::database::Database;
use crate::models::ArchiveStats;

/// Compute archive-wide totals in one snapshot.
pub async fn stats(db: &Database) -> Result<ArchiveStats, ChatvaultError> {
    db.connection()
        .call(|conn| {
            let total_chats: i64 =
                conn.query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))?;
            let total_messages: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE is_deleted = 0",
                [],
                |row| row.get(0),
            )?;
            let total_edits: i64 =
                conn.query_row("SELECT COUNT(*) FROM message_edits", [], |row| row.get(0))?;
            let total_deleted: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE is_deleted = 1",
                [],
                |row| row.get(0),
            )?;
            let fully_loaded_chats: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chats WHERE fully_loaded = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(ArchiveStats {
                total_chats,
                total_messages,
                total_edits,
                total_deleted,
                fully_loaded_chats,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatKind, RawMessage};
    use crate::queries::chats::upsert_chat;
    use crate::queries::messages::{insert_live_message, record_edit, soft_delete};
    use tempfile::tempdir;

    fn make_msg(id: i64, text: &str) -> RawMessage {
        RawMessage {
            id,
            sender_id: None,
            sender_name: None,
            text: Some(text.to_string()),
            date: "2026-01-01T00:00:00Z".to_string(),
            media: None,
            views: None,
            raw: serde_json::json!({"id": id}),
        }
    }

    #[tokio::test]
    async fn stats_count_all_tables() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        upsert_chat(&db, -1001, "A", None, ChatKind::Channel).await.unwrap();
        insert_live_message(&db, -1001, make_msg(1, "a")).await.unwrap();
        insert_live_message(&db, -1001, make_msg(2, "b")).await.unwrap();
        record_edit(&db, -1001, make_msg(1, "a2"), "2026-01-01T01:00:00Z".into())
            .await
            .unwrap();
        soft_delete(&db, -1001, 2).await.unwrap();

        let s = stats(&db).await.unwrap();
        assert_eq!(s.total_chats, 1);
        assert_eq!(s.total_messages, 1);
        assert_eq!(s.total_edits, 1);
        assert_eq!(s.total_deleted, 1);
        assert_eq!(s.fully_loaded_chats, 0);

        db.close().await.unwrap();
    }
}
