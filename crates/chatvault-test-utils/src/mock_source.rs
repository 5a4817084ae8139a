// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted in-memory [`RemoteSource`] for tests.
//!
//! Messages are seeded per chat and served with the same paging semantics
//! as a real adapter. Errors can be injected to fire on the next source
//! call, which lets tests script transient failures, permanent failures,
//! and revoked sessions.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chatvault_core::types::{ChatKind, ChatRef, DialogInfo, RawMessage};
use chatvault_core::{ChatIdentifier, ChatvaultError, RemoteSource};
use tokio::sync::Mutex;

/// Epoch of the synthetic message timeline (2026-01-01T00:00:00Z).
const TIMELINE_START: i64 = 1_767_225_600;

/// Build a plain text message; the id doubles as a second offset so
/// timestamps stay monotonic and RFC 3339 formatted.
pub fn raw_message(id: i64, text: &str) -> RawMessage {
    let date = chrono::DateTime::from_timestamp(TIMELINE_START + id, 0)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default();
    RawMessage {
        id,
        sender_id: Some(1),
        sender_name: Some("tester".to_string()),
        text: Some(text.to_string()),
        date,
        media: None,
        views: None,
        raw: serde_json::json!({"id": id, "message": text}),
    }
}

#[derive(Default)]
struct MockState {
    dialogs: Vec<DialogInfo>,
    /// Messages per chat, kept ascending by id.
    messages: HashMap<i64, Vec<RawMessage>>,
    /// Errors returned by upcoming source calls, in order.
    scripted_errors: VecDeque<ChatvaultError>,
    fetch_calls: usize,
}

/// In-memory remote source with scriptable failures.
#[derive(Default)]
pub struct MockSource {
    state: Mutex<MockState>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_dialog(&self, dialog: DialogInfo) {
        self.state.lock().await.dialogs.push(dialog);
    }

    /// Convenience: register a channel dialog.
    pub async fn add_channel(&self, chat_id: i64, title: &str, username: Option<&str>) {
        self.add_dialog(DialogInfo {
            chat_id,
            title: title.to_string(),
            username: username.map(str::to_string),
            kind: ChatKind::Channel,
        })
        .await;
    }

    /// Seed (or extend) the remote history of a chat.
    pub async fn seed_messages(&self, chat_id: i64, mut messages: Vec<RawMessage>) {
        let mut state = self.state.lock().await;
        let entry = state.messages.entry(chat_id).or_default();
        entry.append(&mut messages);
        entry.sort_by_key(|m| m.id);
    }

    /// Append one message, as if it had just been posted remotely.
    pub async fn push_message(&self, chat_id: i64, message: RawMessage) {
        self.seed_messages(chat_id, vec![message]).await;
    }

    /// Script an error for the next source call. Multiple injections fire
    /// in FIFO order, one per call.
    pub async fn inject_error(&self, error: ChatvaultError) {
        self.state.lock().await.scripted_errors.push_back(error);
    }

    /// Number of fetch calls served (fetch_messages + fetch_since).
    pub async fn fetch_calls(&self) -> usize {
        self.state.lock().await.fetch_calls
    }

    async fn take_scripted_error(&self) -> Option<ChatvaultError> {
        self.state.lock().await.scripted_errors.pop_front()
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    async fn list_dialogs(
        &self,
        limit: usize,
        include_private: bool,
    ) -> Result<Vec<DialogInfo>, ChatvaultError> {
        if let Some(error) = self.take_scripted_error().await {
            return Err(error);
        }
        Ok(self
            .state
            .lock()
            .await
            .dialogs
            .iter()
            .filter(|d| include_private || d.kind != ChatKind::Direct)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_messages(
        &self,
        chat_id: i64,
        before_id: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<RawMessage>, ChatvaultError> {
        if let Some(error) = self.take_scripted_error().await {
            return Err(error);
        }
        let mut state = self.state.lock().await;
        state.fetch_calls += 1;
        let Some(msgs) = state.messages.get(&chat_id) else {
            return Ok(Vec::new());
        };
        let mut page: Vec<RawMessage> = msgs
            .iter()
            .filter(|m| before_id.is_none_or(|b| m.id < b))
            .rev()
            .take(page_size)
            .cloned()
            .collect();
        page.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(page)
    }

    async fn fetch_since(
        &self,
        chat_id: i64,
        min_id: i64,
        limit: usize,
    ) -> Result<Vec<RawMessage>, ChatvaultError> {
        if let Some(error) = self.take_scripted_error().await {
            return Err(error);
        }
        let mut state = self.state.lock().await;
        state.fetch_calls += 1;
        let Some(msgs) = state.messages.get(&chat_id) else {
            return Ok(Vec::new());
        };
        Ok(msgs
            .iter()
            .filter(|m| m.id > min_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn join_chat(&self, identifier: &ChatIdentifier) -> Result<ChatRef, ChatvaultError> {
        if let Some(error) = self.take_scripted_error().await {
            return Err(error);
        }
        let state = self.state.lock().await;
        let dialog = match identifier {
            ChatIdentifier::Id(id) => state.dialogs.iter().find(|d| d.chat_id == *id),
            ChatIdentifier::Username(name) => state
                .dialogs
                .iter()
                .find(|d| d.username.as_deref() == Some(name.as_str())),
            ChatIdentifier::InviteLink(_) => None,
        };
        dialog
            .map(|d| ChatRef {
                chat_id: d.chat_id,
                title: d.title.clone(),
                username: d.username.clone(),
                kind: d.kind,
            })
            .ok_or_else(|| ChatvaultError::Source {
                message: format!("mock source has no chat for {identifier}"),
                kind: chatvault_core::SourceErrorKind::Permanent,
                source: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn paging_matches_adapter_semantics() {
        let source = MockSource::new();
        source
            .seed_messages(-1001, (1..=5).map(|id| raw_message(id, "m")).collect())
            .await;

        let page = source.fetch_messages(-1001, None, 2).await.unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![5, 4]);

        let page = source.fetch_messages(-1001, Some(4), 10).await.unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        assert_eq!(source.fetch_calls().await, 2);
    }

    #[tokio::test]
    async fn injected_errors_fire_once_in_order() {
        let source = MockSource::new();
        source.seed_messages(-1001, vec![raw_message(1, "m")]).await;
        source.inject_error(ChatvaultError::transient("flaky")).await;

        assert!(source.fetch_messages(-1001, None, 10).await.is_err());
        assert!(source.fetch_messages(-1001, None, 10).await.is_ok());
    }
}
