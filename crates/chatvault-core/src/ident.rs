// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat identifier parsing and canonicalization.
//!
//! Remote platforms hand out chat ids in several spellings: a bare positive
//! id, the "marked" channel form (`-100` prefix), a public `@username`, or
//! an invite link. Every stored key uses exactly one format, the marked
//! form, so the split is collapsed here at the adapter boundary and nowhere
//! else.

use serde::{Deserialize, Serialize};

use crate::error::ChatvaultError;
use crate::types::ChatKind;

/// Offset separating a bare channel id from its marked form.
const CHANNEL_ID_MARK: i64 = 1_000_000_000_000;

/// A user-supplied reference to a chat, parsed but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChatIdentifier {
    /// A numeric id, kept exactly as given (marked or bare).
    Id(i64),
    /// A public handle, stored without the leading `@`.
    Username(String),
    /// An invite or public t.me link, stored verbatim.
    InviteLink(String),
}

impl ChatIdentifier {
    /// Parse a user-supplied chat reference.
    ///
    /// Accepts bare numeric ids, marked channel ids (`-100…`), `@username`,
    /// plain usernames, and `t.me/…` links (with or without scheme).
    pub fn parse(input: &str) -> Result<Self, ChatvaultError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ChatvaultError::Config(
                "empty chat identifier".to_string(),
            ));
        }

        if let Ok(id) = trimmed.parse::<i64>() {
            return Ok(Self::Id(id));
        }

        if let Some(handle) = trimmed.strip_prefix('@') {
            if handle.is_empty() {
                return Err(ChatvaultError::Config(
                    "empty username after '@'".to_string(),
                ));
            }
            return Ok(Self::Username(handle.to_string()));
        }

        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        if let Some(rest) = without_scheme.strip_prefix("t.me/") {
            if rest.is_empty() {
                return Err(ChatvaultError::Config(format!(
                    "link carries no chat reference: {trimmed}"
                )));
            }
            // Invite links ("+hash" or legacy "joinchat/") need the join
            // endpoint; a plain path is a public username.
            if rest.starts_with('+') || rest.starts_with("joinchat/") {
                return Ok(Self::InviteLink(trimmed.to_string()));
            }
            return Ok(Self::Username(rest.trim_end_matches('/').to_string()));
        }

        // Bare word with no markers: treat as a username.
        if trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Ok(Self::Username(trimmed.to_string()));
        }

        Err(ChatvaultError::Config(format!(
            "unrecognized chat identifier: {trimmed}"
        )))
    }
}

impl std::fmt::Display for ChatIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "@{name}"),
            Self::InviteLink(link) => write!(f, "{link}"),
        }
    }
}

/// Collapse a platform chat id to its canonical stored form.
///
/// Channels and groups use the marked negative form; a bare positive
/// channel id is converted. Direct chats keep their positive user id.
/// Ids that already carry the mark pass through unchanged.
pub fn canonical_chat_id(raw: i64, kind: ChatKind) -> i64 {
    match kind {
        ChatKind::Direct => raw,
        ChatKind::Channel | ChatKind::Group => {
            if raw < 0 {
                raw
            } else {
                -(CHANNEL_ID_MARK + raw)
            }
        }
    }
}
