// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message delivery and connection resilience over a session transport.
//!
//! The [`DeliveryService`] is the composition root:
//! - Routes immediate sends while the connection is Ready
//! - Enqueues sends into the [`DeliveryQueue`](queue::DeliveryQueue) otherwise
//! - Applies per-recipient admission via [`RateLimiter`](rate_limit::RateLimiter)
//! - Splits long bodies on line boundaries via [`split_message`](splitter::split_message)
//! - Tracks the transport lifecycle in a pure
//!   [`ConnectionStateMachine`](state::ConnectionStateMachine) and drains the
//!   queue every time the session becomes Ready
//!
//! Everything is memory-resident: queued messages do not survive a process
//! restart, and there is no cross-recipient ordering guarantee.

pub mod pairing;
pub mod queue;
pub mod rate_limit;
pub mod service;
pub mod splitter;
pub mod state;

pub use queue::{DeliveryQueue, QueuedItem, QueuedPayload};
pub use rate_limit::RateLimiter;
pub use service::{DeliveryService, ServiceStatus};
pub use splitter::split_message;
pub use state::{ConnectionStateMachine, Effect};
