// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chatvault archiver.

use thiserror::Error;

/// Classification of a remote-source failure.
///
/// The scheduler uses this to decide whether a task failure is worth
/// resubmitting (`Transient`), permanent for this input (`Permanent`), or
/// fatal to all further work until re-authorization (`Unauthorized`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Network timeout, platform-side rate-limit rejection, etc.
    Transient,
    /// Bad identifier, missing chat, unparseable response.
    Permanent,
    /// Session/credentials revoked. Halts the scheduler.
    Unauthorized,
}

/// The primary error type used across all Chatvault crates.
#[derive(Debug, Error)]
pub enum ChatvaultError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, transaction rollback).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Remote source adapter errors, classified by recoverability.
    #[error("source error: {message}")]
    Source {
        message: String,
        kind: SourceErrorKind,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Referenced chat does not exist locally.
    #[error("chat not found: {chat_id}")]
    ChatNotFound { chat_id: i64 },

    /// Referenced task does not exist.
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// A single fetched message failed validation. Skipped within a batch,
    /// never fatal to it.
    #[error("malformed message in chat {chat_id}: {detail}")]
    MalformedMessage { chat_id: i64, detail: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatvaultError {
    /// Shorthand constructor for a transient source failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            kind: SourceErrorKind::Transient,
            source: None,
        }
    }

    /// Shorthand constructor for an authorization failure.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            kind: SourceErrorKind::Unauthorized,
            source: None,
        }
    }

    /// True if this is a transient remote failure worth resubmitting.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Source {
                kind: SourceErrorKind::Transient,
                ..
            }
        )
    }

    /// True if the remote session is no longer authorized.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Source {
                kind: SourceErrorKind::Unauthorized,
                ..
            }
        )
    }
}
