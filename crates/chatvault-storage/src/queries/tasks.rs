// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task queue operations.
//!
//! Tasks move `pending -> processing -> completed | failed`. Dequeue is an
//! atomic oldest-pending selection inside a transaction, so a task is
//! handed to at most one worker. Failed tasks stay failed; resubmission is
//! an explicit new task.

use chatvault_core::types::{TaskRecord, TaskStatus, TaskType};
use chatvault_core::ChatvaultError;
use rusqlite::params;

use crate::database::Database;

/// Insert a new pending task.
pub async fn enqueue(
    db: &Database,
    id: &str,
    task_type: TaskType,
    chat_id: Option<i64>,
    task_params: &serde_json::Value,
) -> Result<(), ChatvaultError> {
    let id = id.to_string();
    let task_type = task_type.to_string();
    let task_params = task_params.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, task_type, chat_id, params, status)
                 VALUES (?1, ?2, ?3, ?4, 'pending')",
                params![id, task_type, chat_id, task_params],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Dequeue the next pending task.
///
/// Atomically selects the oldest pending task and marks it as "processing".
/// Returns `None` if no task is pending.
pub async fn dequeue(db: &Database) -> Result<Option<TaskRecord>, ChatvaultError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, task_type, chat_id, params, status, error, result,
                            created_at, started_at, finished_at
                     FROM tasks WHERE status = 'pending'
                     ORDER BY created_at ASC, id ASC
                     LIMIT 1",
                )?;
                stmt.query_row([], row_to_task)
            };

            match result {
                Ok(task) => {
                    tx.execute(
                        "UPDATE tasks SET status = 'processing',
                         started_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![task.id],
                    )?;
                    tx.commit()?;
                    Ok(Some(TaskRecord {
                        status: TaskStatus::Processing,
                        ..task
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a task completed, attaching an optional result payload.
pub async fn complete(
    db: &Database,
    id: &str,
    result: Option<serde_json::Value>,
) -> Result<(), ChatvaultError> {
    let id = id.to_string();
    let result = result.map(|v| v.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = 'completed', result = ?2,
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, result],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a task failed with an error description. The task is not requeued.
pub async fn fail(db: &Database, id: &str, error: &str) -> Result<(), ChatvaultError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = 'failed', error = ?2,
                 finished_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one task by id.
pub async fn get_task(db: &Database, id: &str) -> Result<Option<TaskRecord>, ChatvaultError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, task_type, chat_id, params, status, error, result,
                        created_at, started_at, finished_at
                 FROM tasks WHERE id = ?1",
                params![id],
                row_to_task,
            );
            match result {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List recent tasks, newest first.
pub async fn list_tasks(db: &Database, limit: i64) -> Result<Vec<TaskRecord>, ChatvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_type, chat_id, params, status, error, result,
                        created_at, started_at, finished_at
                 FROM tasks ORDER BY created_at DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], row_to_task)?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row?);
            }
            Ok(tasks)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of tasks waiting in the queue.
pub async fn pending_count(db: &Database) -> Result<i64, ChatvaultError> {
    db.connection()
        .call(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// True if a pending or processing task of this type already targets the
/// chat. Used by the periodic producer to avoid piling up duplicates.
pub async fn has_active_task(
    db: &Database,
    chat_id: i64,
    task_type: TaskType,
) -> Result<bool, ChatvaultError> {
    let task_type = task_type.to_string();
    db.connection()
        .call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tasks
                 WHERE chat_id = ?1 AND task_type = ?2
                   AND status IN ('pending', 'processing'))",
                params![chat_id, task_type],
                |row| row.get(0),
            )?;
            Ok(n != 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// True while a worker holds a task.
pub async fn is_processing(db: &Database) -> Result<bool, ChatvaultError> {
    db.connection()
        .call(|conn| {
            let n: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tasks WHERE status = 'processing')",
                [],
                |row| row.get(0),
            )?;
            Ok(n != 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    let task_type: String = row.get(1)?;
    let task_type = task_type.parse::<TaskType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status: String = row.get(4)?;
    let status = status.parse::<TaskStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let params_json: String = row.get(3)?;
    let task_params = serde_json::from_str(&params_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let result_json: Option<String> = row.get(6)?;
    let result = match result_json {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };
    Ok(TaskRecord {
        id: row.get(0)?,
        task_type,
        chat_id: row.get(2)?,
        params: task_params,
        status,
        error: row.get(5)?,
        result,
        created_at: row.get(7)?,
        started_at: row.get(8)?,
        finished_at: row.get(9)?,
    })
}
