// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-recipient sliding-window admission control.
//!
//! Each recipient has an independent window of admitted-send timestamps.
//! Entries older than the window are pruned lazily on each admission check,
//! so idle recipients cost nothing after their entries age out.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use courier_config::model::RateLimitConfig;
use courier_core::Recipient;
use tokio::time::Instant;

/// Sliding-window rate limiter keyed by recipient.
pub struct RateLimiter {
    enabled: bool,
    limit: usize,
    window: Duration,
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            limit: config.per_recipient,
            window: Duration::from_millis(config.window_ms),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether a send to `recipient` is admitted right now.
    ///
    /// Admission appends the current timestamp to the recipient's window;
    /// rejection leaves the window untouched. When rate limiting is disabled
    /// at the policy level this always admits and keeps no bookkeeping, so
    /// memory never grows for recipients that are never rate-checked.
    pub fn admit(&self, recipient: &Recipient) -> bool {
        if !self.enabled {
            return true;
        }

        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let entries = windows.entry(recipient.as_str().to_string()).or_default();

        entries.retain(|t| now.duration_since(*t) < self.window);

        if entries.len() >= self.limit {
            return false;
        }

        entries.push(now);
        true
    }

    /// Number of recipients currently holding window state.
    pub fn tracked_recipients(&self) -> usize {
        self.windows.lock().expect("rate limiter lock poisoned").len()
    }
}
