// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session-transport trait consumed by the delivery layer.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{
    ChatInfo, ContactInfo, InboundMessage, MediaPayload, MessageId, Recipient,
};

/// A session-based messaging transport.
///
/// The delivery layer is the only component that invokes lifecycle
/// operations (`connect`, `destroy`) on a transport; lifecycle *events*
/// flow the other way as [`TransportEvent`](crate::types::TransportEvent)
/// values over a channel the adapter writes to.
///
/// `send_text` is not assumed to be idempotent: the delivery layer never
/// retries an attempt whose outcome is ambiguous beyond its bounded retry
/// budget, and callers must tolerate unknown outcomes on transport-level
/// ambiguity.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Human-readable adapter name, used in logs.
    fn name(&self) -> &str;

    /// Establishes (or re-establishes) the session.
    async fn connect(&self) -> Result<(), CourierError>;

    /// Sends one text message to a recipient.
    async fn send_text(
        &self,
        recipient: &Recipient,
        body: &str,
    ) -> Result<MessageId, CourierError>;

    /// Sends one media payload with an optional caption.
    async fn send_media(
        &self,
        recipient: &Recipient,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<MessageId, CourierError>;

    /// Signals a composing indicator to the recipient.
    async fn send_typing(&self, recipient: &Recipient) -> Result<(), CourierError>;

    /// Looks up a chat by its identifier.
    async fn chat_by_id(&self, id: &str) -> Result<ChatInfo, CourierError>;

    /// Looks up a contact by its identifier.
    async fn contact_by_id(&self, id: &str) -> Result<ContactInfo, CourierError>;

    /// Lists the chats known to the session.
    async fn list_chats(&self) -> Result<Vec<ChatInfo>, CourierError>;

    /// Retrieves the media attached to an inbound message, if any.
    ///
    /// `Ok(None)` means the transport could not produce the content; the
    /// delivery layer reports that identically to a message without media.
    async fn download_media(
        &self,
        message: &InboundMessage,
    ) -> Result<Option<MediaPayload>, CourierError>;

    /// Tears down the session, releasing any held resources.
    async fn destroy(&self) -> Result<(), CourierError>;
}
