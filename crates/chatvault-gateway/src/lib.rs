// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket API for the Chatvault archiver.
//!
//! Read endpoints query the store directly; mutating work goes through the
//! task queue so the serial worker stays the only writer of remote data.
//! `/ws` streams the archiver's event feed to connected clients.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{serve, GatewayState};
