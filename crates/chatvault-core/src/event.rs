// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time event vocabulary pushed to WebSocket subscribers.
//!
//! Events are JSON-framed with a `type` discriminant. Delivery is ordered
//! per publisher and best-effort: a subscriber that lags or disconnects is
//! dropped without affecting ingestion.

use serde::{Deserialize, Serialize};

use crate::types::{TaskStatus, TaskType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task reached a terminal state. Failures are carried in `status`
    /// and `error`, not as a separate event type.
    TaskCompleted {
        task_id: String,
        task_type: TaskType,
        status: TaskStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A previously unseen message was stored from a live update.
    NewMessage {
        chat_id: i64,
        message_id: i64,
        chat_title: Option<String>,
        text: Option<String>,
        sender_name: Option<String>,
        message_date: String,
    },
    /// A backfill task finished for a chat.
    ChatLoaded {
        chat_id: i64,
        new_messages: i64,
        fully_loaded: bool,
    },
    /// Progress heartbeat emitted once per backfill page.
    LoadingProgress { chat_id: i64, loaded: i64, total: i64 },
    /// A missed-check pass stored `count` gap-filled messages.
    MissedLoaded { chat_id: i64, count: i64 },
    /// A stored message's content changed.
    MessageEdited {
        chat_id: i64,
        message_id: i64,
        new_text: Option<String>,
        edit_date: String,
    },
    /// A stored message was tombstoned.
    MessageDeleted { chat_id: i64, message_id: i64 },
    /// Reply to a client `{"type": "ping"}` frame.
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_type_discriminant() {
        let event = Event::MissedLoaded { chat_id: -100123, count: 5 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "missed_loaded");
        assert_eq!(json["chat_id"], -100123);
        assert_eq!(json["count"], 5);
    }

    #[test]
    fn task_completed_omits_null_error() {
        let event = Event::TaskCompleted {
            task_id: "abc".into(),
            task_type: TaskType::LoadHistory,
            status: TaskStatus::Completed,
            error: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("error"));
        assert!(json.contains("\"type\":\"task_completed\""));
    }

    #[test]
    fn pong_is_bare_type_frame() {
        assert_eq!(
            serde_json::to_string(&Event::Pong).unwrap(),
            "{\"type\":\"pong\"}"
        );
    }
}
