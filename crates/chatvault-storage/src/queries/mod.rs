// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the single-writer [`Database`](crate::Database).

pub mod chats;
pub mod edits;
pub mod messages;
pub mod stats;
pub mod tasks;
