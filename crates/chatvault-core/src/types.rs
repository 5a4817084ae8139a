// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Chatvault workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What kind of conversation a chat is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChatKind {
    Channel,
    Group,
    Direct,
}

/// The kinds of work the scheduler knows how to run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskType {
    /// Page backwards through a chat's history until fully loaded.
    LoadHistory,
    /// Fetch messages that arrived while the archiver was offline.
    LoadMissed,
    /// Join a chat by identifier, then optionally load its history.
    JoinChat,
    /// Materialize a bounded message export as the task result.
    Export,
}

/// Task lifecycle. Terminal states (`Completed`, `Failed`) are retained.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A dialog as reported by the remote source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogInfo {
    pub chat_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub kind: ChatKind,
}

/// Reference to a chat returned by a successful join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRef {
    pub chat_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub kind: ChatKind,
}

/// Media attached to a message. Only a descriptor is stored; blob
/// contents are out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub media_type: String,
    pub media_ref: Option<String>,
}

/// A message as fetched from the remote source, before reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Platform-assigned id, strictly increasing within a chat.
    pub id: i64,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub text: Option<String>,
    /// RFC 3339 timestamp assigned by the platform.
    pub date: String,
    pub media: Option<MediaDescriptor>,
    pub views: Option<i64>,
    /// Full source-of-truth snapshot as received.
    pub raw: serde_json::Value,
}

/// Persisted chat row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub kind: ChatKind,
    /// Oldest message id backfill has fetched. `None` = never ran.
    pub backfill_cursor: Option<i64>,
    pub fully_loaded: bool,
    /// Newest message id observed, from any mode.
    pub last_seen_message_id: Option<i64>,
    pub total_loaded: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted message row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub chat_id: i64,
    pub message_id: i64,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub text: Option<String>,
    pub message_date: String,
    pub media_type: Option<String>,
    pub media_ref: Option<String>,
    pub views: Option<i64>,
    pub edit_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub saved_at: String,
}

/// One append-only edit record. `seq` is strictly increasing per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRecord {
    pub chat_id: i64,
    pub message_id: i64,
    pub seq: i64,
    pub old_text: Option<String>,
    pub new_text: Option<String>,
    pub edit_date: String,
}

/// Append-only lifecycle event (currently only deletions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub chat_id: i64,
    pub message_id: i64,
    pub event_type: String,
    pub event_date: String,
}

/// Persisted task row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub task_type: TaskType,
    pub chat_id: Option<i64>,
    pub params: serde_json::Value,
    pub status: TaskStatus,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

/// Aggregate archive statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub total_chats: i64,
    pub total_messages: i64,
    pub total_edits: i64,
    pub total_deleted: i64,
    pub fully_loaded_chats: i64,
}
