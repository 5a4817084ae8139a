// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer documentation and enforcement.
//!
//! Every write path in chatvault-storage goes through the one
//! `tokio_rusqlite::Connection` held by [`crate::Database`]. The background
//! thread behind that connection is the single writer; batch operations
//! (backfill pages, missed batches, edits) open their transactions inside
//! one `conn.call()` closure so the message rows and the chat cursor move
//! together or not at all.
//!
//! **Do NOT open additional Connection instances for writes.** A second
//! writer reintroduces SQLITE_BUSY under load and breaks the atomicity
//! assumption the reconciler relies on.
