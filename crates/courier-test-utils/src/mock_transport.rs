// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `Transport` with captured outbound sends and
//! scriptable failures, so delivery behavior can be asserted without a real
//! session.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use courier_core::types::{
    ChatInfo, ContactInfo, InboundMessage, MediaPayload, MessageId, Recipient,
};
use courier_core::{CourierError, Transport};

/// One captured outbound interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentItem {
    Text {
        recipient: Recipient,
        body: String,
    },
    Media {
        recipient: Recipient,
        mimetype: String,
        caption: Option<String>,
    },
    Typing {
        recipient: Recipient,
    },
}

/// A scriptable mock messaging transport.
///
/// Successful sends are captured for assertion; `fail_next_sends(n)` makes
/// the next `n` send calls return a transport error without capturing.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<SentItem>>,
    fail_remaining: AtomicU32,
    failed_sends: AtomicU32,
    connect_calls: AtomicU32,
    destroy_calls: AtomicU32,
    next_id: AtomicU64,
    chats: Mutex<Vec<ChatInfo>>,
    media_response: Mutex<Option<MediaPayload>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` send calls fail with a transport error.
    pub fn fail_next_sends(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// All successfully captured sends, in call order.
    pub fn sent_items(&self) -> Vec<SentItem> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    /// Bodies of captured text sends to `recipient`, in call order.
    pub fn texts_to(&self, recipient: &Recipient) -> Vec<String> {
        self.sent_items()
            .into_iter()
            .filter_map(|item| match item {
                SentItem::Text { recipient: r, body } if &r == recipient => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mock lock poisoned").len()
    }

    pub fn failed_send_count(&self) -> u32 {
        self.failed_sends.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> u32 {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    /// Seed the chat listing returned by `list_chats` / `chat_by_id`.
    pub fn set_chats(&self, chats: Vec<ChatInfo>) {
        *self.chats.lock().expect("mock lock poisoned") = chats;
    }

    /// Seed the payload returned by `download_media`.
    pub fn set_media_response(&self, media: Option<MediaPayload>) {
        *self.media_response.lock().expect("mock lock poisoned") = media;
    }

    fn take_scripted_failure(&self) -> bool {
        let failed = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            self.failed_sends.fetch_add(1, Ordering::SeqCst);
        }
        failed
    }

    fn next_message_id(&self) -> MessageId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        MessageId(format!("mock-{n}"))
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    async fn connect(&self) -> Result<(), CourierError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(
        &self,
        recipient: &Recipient,
        body: &str,
    ) -> Result<MessageId, CourierError> {
        if self.take_scripted_failure() {
            return Err(CourierError::transport("scripted send failure"));
        }
        self.sent.lock().expect("mock lock poisoned").push(SentItem::Text {
            recipient: recipient.clone(),
            body: body.to_string(),
        });
        Ok(self.next_message_id())
    }

    async fn send_media(
        &self,
        recipient: &Recipient,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<MessageId, CourierError> {
        if self.take_scripted_failure() {
            return Err(CourierError::transport("scripted send failure"));
        }
        self.sent.lock().expect("mock lock poisoned").push(SentItem::Media {
            recipient: recipient.clone(),
            mimetype: media.mimetype.clone(),
            caption: caption.map(String::from),
        });
        Ok(self.next_message_id())
    }

    async fn send_typing(&self, recipient: &Recipient) -> Result<(), CourierError> {
        self.sent.lock().expect("mock lock poisoned").push(SentItem::Typing {
            recipient: recipient.clone(),
        });
        Ok(())
    }

    async fn chat_by_id(&self, id: &str) -> Result<ChatInfo, CourierError> {
        self.chats
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CourierError::transport(format!("chat {id} not found")))
    }

    async fn contact_by_id(&self, id: &str) -> Result<ContactInfo, CourierError> {
        Err(CourierError::transport(format!("contact {id} not found")))
    }

    async fn list_chats(&self) -> Result<Vec<ChatInfo>, CourierError> {
        Ok(self.chats.lock().expect("mock lock poisoned").clone())
    }

    async fn download_media(
        &self,
        _message: &InboundMessage,
    ) -> Result<Option<MediaPayload>, CourierError> {
        Ok(self.media_response.lock().expect("mock lock poisoned").clone())
    }

    async fn destroy(&self) -> Result<(), CourierError> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
