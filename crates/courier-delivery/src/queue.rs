// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory FIFO buffer of pending send requests.
//!
//! Items are timestamped at enqueue time and checked for staleness when
//! dequeued: after a long outage it is better to drop a queued message than
//! to deliver content that stopped being relevant minutes ago.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use courier_core::types::{DeliveryOptions, MediaPayload, Recipient};
use tokio::time::Instant;
use tracing::{debug, warn};

/// The payload of a queued send request.
#[derive(Debug, Clone)]
pub enum QueuedPayload {
    Text(String),
    Media {
        media: MediaPayload,
        caption: Option<String>,
    },
}

/// A pending unit of outbound work, created when a send is attempted while
/// the connection is not ready.
#[derive(Debug, Clone)]
pub struct QueuedItem {
    pub recipient: Recipient,
    pub payload: QueuedPayload,
    pub options: DeliveryOptions,
    pub enqueued_at: Instant,
}

impl QueuedItem {
    pub fn text(recipient: Recipient, body: String, options: DeliveryOptions) -> Self {
        Self {
            recipient,
            payload: QueuedPayload::Text(body),
            options,
            enqueued_at: Instant::now(),
        }
    }

    pub fn media(
        recipient: Recipient,
        media: MediaPayload,
        caption: Option<String>,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            recipient,
            payload: QueuedPayload::Media { media, caption },
            options,
            enqueued_at: Instant::now(),
        }
    }

    fn age(&self) -> Duration {
        self.enqueued_at.elapsed()
    }
}

/// FIFO delivery queue with staleness expiry at dequeue time.
///
/// Ordering is preserved across items from different recipients; there is no
/// recipient-level priority. The queue itself is not a drain coordinator —
/// the delivery service guarantees a single active drain via its own guard.
pub struct DeliveryQueue {
    items: Mutex<VecDeque<QueuedItem>>,
    stale_after: Duration,
}

impl DeliveryQueue {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            stale_after,
        }
    }

    /// Append an item to the back of the queue.
    pub fn enqueue(&self, item: QueuedItem) {
        let mut items = self.items.lock().expect("delivery queue lock poisoned");
        items.push_back(item);
        debug!(queue_len = items.len(), "item enqueued");
    }

    /// Remove and return every non-stale item, in FIFO order.
    ///
    /// Stale items are discarded here rather than sent; each drop is logged
    /// with its age so the loss is traceable.
    pub fn dequeue_ready(&self) -> Vec<QueuedItem> {
        let drained: Vec<QueuedItem> = {
            let mut items = self.items.lock().expect("delivery queue lock poisoned");
            items.drain(..).collect()
        };

        drained
            .into_iter()
            .filter(|item| {
                let age = item.age();
                if age > self.stale_after {
                    warn!(
                        recipient = item.recipient.as_str(),
                        age_secs = age.as_secs(),
                        "dropping stale queued item"
                    );
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    /// Put items back at the front of the queue, preserving their order.
    ///
    /// Used when the connection leaves Ready mid-drain: the undelivered
    /// remainder waits for the next Ready transition.
    pub fn requeue_front(&self, returned: Vec<QueuedItem>) {
        let mut items = self.items.lock().expect("delivery queue lock poisoned");
        for item in returned.into_iter().rev() {
            items.push_front(item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("delivery queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
