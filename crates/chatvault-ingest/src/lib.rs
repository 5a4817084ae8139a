// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline for the Chatvault archiver.
//!
//! Pulls remote chat history through a rate-limited source adapter,
//! reconciles it against the local store (backfill, missed check, live
//! update), and drives everything from a serial task queue with a periodic
//! missed-check producer.

pub mod missed_tick;
pub mod rate_limit;
pub mod reconcile;
pub mod replay;
pub mod retry;
pub mod scheduler;

pub use rate_limit::RateLimiter;
pub use reconcile::{LiveUpdate, PageOutcome, Reconciler};
pub use replay::ReplaySource;
pub use retry::RetryPolicy;
pub use scheduler::{QueueHandle, Scheduler};
