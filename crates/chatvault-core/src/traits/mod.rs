// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for pluggable Chatvault components.

pub mod source;

pub use source::RemoteSource;
