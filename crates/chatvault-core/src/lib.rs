// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chatvault chat archiver.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Chatvault workspace: the `RemoteSource`
//! adapter boundary, the persisted record types, and the event vocabulary
//! pushed to real-time subscribers.

pub mod error;
pub mod event;
pub mod ident;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ChatvaultError, SourceErrorKind};
pub use event::Event;
pub use ident::{canonical_chat_id, ChatIdentifier};
pub use traits::RemoteSource;
