// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `chatvault-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use chatvault_core::types::{
    ArchiveStats, ChatKind, ChatRecord, EditRecord, MessageEvent, MessageRecord, RawMessage,
    TaskRecord, TaskStatus, TaskType,
};
