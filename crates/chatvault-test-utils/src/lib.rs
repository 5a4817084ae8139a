// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the Chatvault workspace.

pub mod mock_source;

pub use mock_source::{raw_message, MockSource};
