// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry with exponential backoff for transient source failures.

use std::time::Duration;

use chatvault_core::ChatvaultError;
use tracing::warn;

/// Retry policy applied around remote source calls at the scheduler
/// boundary. Only errors classified transient are retried; unauthorized
/// and permanent failures surface immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Run `op` until it succeeds, fails non-transiently, or the attempt
    /// budget is spent. The delay doubles after each failed attempt.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ChatvaultError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChatvaultError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(attempt, ?delay, error = %e, "transient source failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}
