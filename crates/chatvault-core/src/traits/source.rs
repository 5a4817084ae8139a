// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The remote source adapter boundary.
//!
//! Everything the archiver knows about the messaging platform goes through
//! this trait. The ingest engine never sees transport details; adapters
//! never see storage. Errors must be classified (`SourceErrorKind`) so the
//! scheduler can distinguish retryable failures from revoked sessions.

use async_trait::async_trait;

use crate::error::ChatvaultError;
use crate::ident::ChatIdentifier;
use crate::types::{ChatRef, DialogInfo, RawMessage};

/// A connection to the remote messaging platform.
///
/// Implementations must be cheap to share (`Arc`) and safe to call
/// concurrently; the rate limiter in front of them serializes actual
/// request pacing.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// List the dialogs visible to the session.
    async fn list_dialogs(
        &self,
        limit: usize,
        include_private: bool,
    ) -> Result<Vec<DialogInfo>, ChatvaultError>;

    /// Fetch up to `page_size` messages older than `before_id`,
    /// newest-first. `None` starts from the newest message in the chat.
    /// An empty page means no older messages exist.
    async fn fetch_messages(
        &self,
        chat_id: i64,
        before_id: Option<i64>,
        page_size: usize,
    ) -> Result<Vec<RawMessage>, ChatvaultError>;

    /// Fetch up to `limit` messages with id strictly greater than
    /// `min_id`, for gap filling after downtime.
    async fn fetch_since(
        &self,
        chat_id: i64,
        min_id: i64,
        limit: usize,
    ) -> Result<Vec<RawMessage>, ChatvaultError>;

    /// Join (or resolve) a chat by identifier.
    async fn join_chat(
        &self,
        identifier: &ChatIdentifier,
    ) -> Result<ChatRef, ChatvaultError>;
}
