// pahe-dl - AnimePahe stream resolver and downloader
// Copyright (C) 2025 pahe-dl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Bounded retry for segment retrieval
//!
//! A failed HTTP status retries immediately; a transport-level failure waits
//! out a short delay first. The policy is a plain value so tests and callers
//! can tighten or widen the budget without touching the retrieval code.
//! Delays go through `tokio::time::sleep`, so tests drive them with the
//! paused test clock.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Why a single retrieval attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Server answered with a non-success status
    Status(u16),
    /// Request never completed (connect failure, timeout, reset)
    Transport(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "status {code}"),
            Self::Transport(reason) => write!(f, "transport failure: {reason}"),
        }
    }
}

/// Retry budget for one segment
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before re-attempting after a transport-level failure
    pub transport_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transport_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `attempt` until it succeeds or the budget is spent.
    ///
    /// Returns the last attempt's error together with the number of attempts
    /// actually made. The delay is only applied when another attempt will
    /// follow; the final failure surfaces immediately.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> std::result::Result<T, (u32, AttemptError)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let mut last = AttemptError::Transport("no attempts made".into());
        for n in 1..=self.max_attempts {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let will_retry = n < self.max_attempts;
                    if will_retry && matches!(err, AttemptError::Transport(_)) {
                        sleep(self.transport_delay).await;
                    }
                    last = err;
                }
            }
        }
        Err((self.max_attempts, last))
    }
}
