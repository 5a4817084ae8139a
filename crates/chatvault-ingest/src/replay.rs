// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture-backed remote source.
//!
//! Serves dialogs and messages from a JSON file, which is the adapter the
//! binary ships with; the real platform binding is out of scope. Fixture
//! shape:
//!
//! ```json
//! {
//!   "dialogs": [{"chat_id": -1001, "title": "…", "username": "…", "kind": "channel"}],
//!   "messages": {"-1001": [{"id": 1, "date": "…", "text": "…", "raw": {}}]}
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chatvault_core::types::{ChatKind, ChatRef, DialogInfo, RawMessage};
use chatvault_core::{ChatIdentifier, ChatvaultError, RemoteSource, SourceErrorKind};
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    dialogs: Vec<DialogInfo>,
    #[serde(default)]
    messages: HashMap<String, Vec<RawMessage>>,
}

pub struct ReplaySource {
    dialogs: Vec<DialogInfo>,
    messages: HashMap<i64, Vec<RawMessage>>,
}

impl ReplaySource {
    pub fn from_file(path: &Path) -> Result<Self, ChatvaultError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatvaultError::Config(format!("cannot read replay fixture {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ChatvaultError> {
        let fixture: Fixture = serde_json::from_str(content)
            .map_err(|e| ChatvaultError::Config(format!("invalid replay fixture: {e}")))?;

        let mut messages = HashMap::new();
        for (key, mut msgs) in fixture.messages {
            let chat_id: i64 = key.parse().map_err(|_| {
                ChatvaultError::Config(format!("replay fixture has non-numeric chat key `{key}`"))
            })?;
            msgs.sort_by_key(|m| m.id);
            messages.insert(chat_id, msgs);
        }
        info!(
            dialogs = fixture.dialogs.len(),
            chats = messages.len(),
            "replay fixture loaded"
        );
        Ok(Self {
            dialogs: fixture.dialogs,
            messages,
        })
    }
}

#[async_trait]
impl RemoteSource for ReplaySource {
    async fn list_dialogs(
        &self,
        limit: usize,
        include_private: bool,
    ) -> Result<Vec<DialogInfo>, ChatvaultError> {
        Ok(self
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
        let Some(msgs) = self.messages.get(&chat_id) else {
            return Ok(Vec::new());
        };
        // Stored ascending; serve the newest page below the cursor.
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
        let Some(msgs) = self.messages.get(&chat_id) else {
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
        let dialog = match identifier {
            ChatIdentifier::Id(id) => self.dialogs.iter().find(|d| d.chat_id == *id),
            ChatIdentifier::Username(name) => self
                .dialogs
                .iter()
                .find(|d| d.username.as_deref() == Some(name.as_str())),
            ChatIdentifier::InviteLink(_) => {
                return Err(ChatvaultError::Source {
                    message: "replay source cannot resolve invite links".to_string(),
                    kind: SourceErrorKind::Permanent,
                    source: None,
                });
            }
        };
        dialog
            .map(|d| ChatRef {
                chat_id: d.chat_id,
                title: d.title.clone(),
                username: d.username.clone(),
                kind: d.kind,
            })
            .ok_or_else(|| ChatvaultError::Source {
                message: format!("no such chat in replay fixture: {identifier}"),
                kind: SourceErrorKind::Permanent,
                source: None,
            })
    }
}
