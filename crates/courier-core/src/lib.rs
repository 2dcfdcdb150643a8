// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier delivery layer.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Courier workspace. Transport adapters
//! implement [`Transport`]; the delivery crate consumes it.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use traits::{ImageAnalyzer, Transport};
pub use types::{
    ConnectionState, DeliveryOptions, MediaPayload, MediaSource, MessageId, Recipient,
    TransportEvent,
};
