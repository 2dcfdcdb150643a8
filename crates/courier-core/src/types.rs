// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transport trait and the delivery layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque identifier for a message destination (individual or group).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient(pub String);

impl Recipient {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a message assigned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Per-call delivery options.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryOptions {
    /// Skip the composing indicator and its pacing delay.
    pub skip_typing: bool,
    /// Never retry on transport failure (used for drained queue items).
    pub suppress_retry: bool,
    /// Number of attempts already consumed before this call.
    pub retry_count: u32,
}

/// Normalized media ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    /// Full mimetype, e.g. `image/jpeg`.
    pub mimetype: String,
    /// Filename presented to the recipient.
    pub filename: String,
    /// Raw content bytes.
    pub data: Vec<u8>,
}

impl MediaPayload {
    /// The mimetype subtype (`jpeg` for `image/jpeg`), checked against the
    /// configured format allow-list.
    pub fn format(&self) -> Option<&str> {
        self.mimetype.split('/').nth(1)
    }
}

/// The caller-facing media forms accepted by `send_media`, all normalized to
/// a [`MediaPayload`] before transmission.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// Read from a file; mimetype derived from the extension.
    Path(PathBuf),
    /// Raw bytes with optional metadata.
    Bytes {
        data: Vec<u8>,
        mimetype: Option<String>,
        filename: Option<String>,
    },
    /// Already normalized.
    Payload(MediaPayload),
}

/// Identity of the authenticated session, reported on the `Ready` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfInfo {
    pub display_name: String,
    pub user_id: String,
}

/// A chat known to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: String,
    pub name: Option<String>,
    pub is_group: bool,
}

/// A contact known to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub id: String,
    pub display_name: Option<String>,
    pub number: Option<String>,
}

/// An inbound message reference, used to download attached media.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub sender: Recipient,
    pub body: String,
    pub has_media: bool,
}

/// Lifecycle events emitted by the transport.
///
/// Transport adapters translate their native callbacks into these tagged
/// variants; the connection state machine consumes them through a single
/// transition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A pairing challenge that must be surfaced to the operator.
    PairingChallenge(String),
    /// The session is authenticated and usable.
    Ready(SelfInfo),
    /// Authentication confirmed (informational; `Ready` gates usability).
    Authenticated,
    /// Unrecoverable authentication failure.
    AuthFailed(String),
    /// The transport connection dropped.
    Disconnected(String),
    /// Session bootstrap progress.
    LoadProgress { percent: u8, stage: String },
    /// A non-fatal transport error.
    Error(String),
}

/// Connection lifecycle state. Exactly one instance exists per process,
/// owned by the connection state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ConnectionState {
    Initializing,
    AwaitingPairing,
    Ready,
    Disconnected,
    Restarting,
    Failed,
}
