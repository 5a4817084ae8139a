// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event fan-out for the Chatvault archiver.
//!
//! One ordered `tokio::sync::broadcast` channel carries every [`Event`] to
//! all live subscribers. Delivery is best effort and at-most-once: a
//! subscriber that disconnects or lags behind the channel capacity misses
//! events and is expected to re-sync through the pull API. Publishing never
//! blocks ingestion.

use chatvault_core::Event;
use tokio::sync::broadcast;
use tracing::trace;

/// Default broadcast channel capacity. A subscriber further behind than
/// this is lagged and loses the overwritten events.
const DEFAULT_CAPACITY: usize = 256;

/// Shared event broadcaster. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will observe it. Zero
    /// subscribers is not an error.
    pub fn publish(&self, event: Event) -> usize {
        trace!(?event, "publishing event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Open a new subscription. Only events published after this call are
    /// delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
