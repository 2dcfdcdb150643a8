// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delivery service: the composition root that routes immediate sends
//! when the connection is ready, enqueues otherwise, and owns the single
//! drain loop.
//!
//! Delivery outcomes are booleans, not errors: a rate-limited or queued
//! send is a defined result of the call, and transport failures surface as
//! `false` after the bounded retry budget is spent. Callers must tolerate
//! unknown outcomes on transport-level ambiguity — the underlying send is
//! not assumed idempotent, so the retry budget is never exceeded.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use courier_config::CourierConfig;
use courier_core::types::{
    ChatInfo, ConnectionState, ContactInfo, DeliveryOptions, InboundMessage, MediaPayload,
    MediaSource, Recipient, TransportEvent,
};
use courier_core::{CourierError, ImageAnalyzer, Transport};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pairing;
use crate::queue::{DeliveryQueue, QueuedItem, QueuedPayload};
use crate::rate_limit::RateLimiter;
use crate::splitter::split_message;
use crate::state::{ConnectionStateMachine, Effect};

/// Operator-facing snapshot of the service.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub state: ConnectionState,
    pub ready: bool,
    pub queue_len: usize,
    pub restart_attempts: u32,
}

/// Outbound message delivery over a session transport.
///
/// Owns the delivery queue, the rate limiter, and the connection state
/// machine; the transport connection handle is shared with no other
/// component.
pub struct DeliveryService {
    transport: Arc<dyn Transport>,
    config: CourierConfig,
    queue: DeliveryQueue,
    limiter: RateLimiter,
    ready: Arc<AtomicBool>,
    draining: AtomicBool,
    state: Mutex<ConnectionStateMachine>,
}

impl DeliveryService {
    pub fn new(transport: Arc<dyn Transport>, config: CourierConfig) -> Arc<Self> {
        let ready = Arc::new(AtomicBool::new(false));
        let machine = ConnectionStateMachine::new(&config.transport, Arc::clone(&ready));

        Arc::new(Self {
            limiter: RateLimiter::new(&config.rate_limit),
            queue: DeliveryQueue::new(Duration::from_millis(
                config.delivery.queue_stale_after_ms,
            )),
            transport,
            config,
            ready,
            draining: AtomicBool::new(false),
            state: Mutex::new(machine),
        })
    }

    /// Whether the transport session is currently usable.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ServiceStatus {
        let machine = self.state.lock().expect("state machine lock poisoned");
        ServiceStatus {
            state: machine.state(),
            ready: self.is_ready(),
            queue_len: self.queue.len(),
            restart_attempts: machine.restart_attempts(),
        }
    }

    /// Establish the transport session. Lifecycle events begin flowing to
    /// the supervisor once this returns.
    pub async fn connect(&self) -> Result<(), CourierError> {
        self.transport.connect().await
    }

    /// Tear down the session and stop accepting immediate sends.
    pub async fn shutdown(&self) {
        self.ready.store(false, Ordering::SeqCst);
        if let Err(e) = self.transport.destroy().await {
            warn!(error = %e, "error destroying transport session");
        }
        info!("delivery service shut down");
    }

    /// Send a text message, or queue it if the connection is not ready.
    ///
    /// Returns `true` only when every chunk was handed to the transport.
    /// Rate-limited sends are dropped, not queued — a chatty recipient must
    /// not grow the backlog unboundedly.
    pub async fn send_message(
        &self,
        recipient: &Recipient,
        body: &str,
        options: DeliveryOptions,
    ) -> bool {
        if !self.is_ready() {
            self.queue.enqueue(QueuedItem::text(
                recipient.clone(),
                body.to_string(),
                options,
            ));
            info!(
                recipient = recipient.as_str(),
                queue_len = self.queue.len(),
                "transport not ready, message queued"
            );
            return false;
        }

        if !self.limiter.admit(recipient) {
            warn!(
                recipient = recipient.as_str(),
                "rate limit exceeded, dropping message"
            );
            return false;
        }

        if self.config.delivery.send_typing && !options.skip_typing {
            if let Err(e) = self.transport.send_typing(recipient).await {
                debug!(error = %e, "failed to send composing indicator");
            }
            sleep(Duration::from_millis(self.config.delivery.typing_delay_ms)).await;
        }

        let chunks = split_message(body, self.config.delivery.max_message_length);

        // Bounded retry loop; the attempt count rides as loop state rather
        // than call-stack depth.
        let mut attempt = options.retry_count;
        loop {
            if !self.is_ready() {
                // Connection lost mid-flight: fall into the queued path with
                // the attempts spent so far.
                self.queue.enqueue(QueuedItem::text(
                    recipient.clone(),
                    body.to_string(),
                    DeliveryOptions {
                        retry_count: attempt,
                        ..options
                    },
                ));
                info!(
                    recipient = recipient.as_str(),
                    "connection lost during delivery, message queued"
                );
                return false;
            }

            match self.deliver_chunks(recipient, &chunks).await {
                Ok(()) => {
                    info!(
                        recipient = recipient.as_str(),
                        chunks = chunks.len(),
                        "message sent"
                    );
                    return true;
                }
                Err(e) => {
                    if options.suppress_retry || attempt >= self.config.delivery.max_retries {
                        warn!(
                            recipient = recipient.as_str(),
                            attempt,
                            error = %e,
                            "message delivery failed, giving up"
                        );
                        return false;
                    }
                    attempt += 1;
                    info!(
                        recipient = recipient.as_str(),
                        attempt, "retrying message send"
                    );
                    sleep(Duration::from_millis(self.config.delivery.retry_delay_ms)).await;
                }
            }
        }
    }

    /// Deliver chunks strictly in split order with the configured pacing
    /// delay between them.
    ///
    /// Empty chunks can appear next to a hard-split line with a trailing
    /// newline; they carry no content and are never handed to the transport.
    async fn deliver_chunks(
        &self,
        recipient: &Recipient,
        chunks: &[String],
    ) -> Result<(), CourierError> {
        let chunks: Vec<&str> = chunks
            .iter()
            .filter(|c| !c.is_empty())
            .map(String::as_str)
            .collect();
        for (i, chunk) in chunks.iter().enumerate() {
            self.transport.send_text(recipient, chunk).await?;
            if i + 1 < chunks.len() {
                sleep(Duration::from_millis(
                    self.config.delivery.inter_message_delay_ms,
                ))
                .await;
            }
        }
        Ok(())
    }

    /// Send media with an optional caption, or queue it if the connection is
    /// not ready.
    ///
    /// The source is normalized to a single payload and validated against
    /// the format allow-list and size limit *before* anything else: invalid
    /// media is rejected outright, never enqueued, and never reaches the
    /// transport.
    pub async fn send_media(
        &self,
        recipient: &Recipient,
        source: MediaSource,
        caption: Option<&str>,
        options: DeliveryOptions,
    ) -> bool {
        let media = match self.normalize_media(source).await {
            Ok(media) => media,
            Err(e) => {
                warn!(
                    recipient = recipient.as_str(),
                    error = %e,
                    "media normalization failed"
                );
                return false;
            }
        };

        if let Err(reason) = self.validate_media(&media) {
            warn!(
                recipient = recipient.as_str(),
                reason, "media rejected by validation"
            );
            return false;
        }

        if !self.is_ready() {
            self.queue.enqueue(QueuedItem::media(
                recipient.clone(),
                media,
                caption.map(String::from),
                options,
            ));
            info!(
                recipient = recipient.as_str(),
                queue_len = self.queue.len(),
                "transport not ready, media queued"
            );
            return false;
        }

        if !self.limiter.admit(recipient) {
            warn!(
                recipient = recipient.as_str(),
                "rate limit exceeded, dropping media"
            );
            return false;
        }

        match self.transport.send_media(recipient, &media, caption).await {
            Ok(_) => {
                info!(recipient = recipient.as_str(), "media sent");
                true
            }
            Err(e) => {
                error!(recipient = recipient.as_str(), error = %e, "error sending media");
                false
            }
        }
    }

    /// Retrieve and validate the media attached to an inbound message.
    ///
    /// Returns `None` when the message carries no media, the transport
    /// cannot retrieve it, or the content fails validation — none of these
    /// are retryable by this layer, so the caller sees them identically.
    pub async fn download_media(&self, message: &InboundMessage) -> Option<MediaPayload> {
        if !message.has_media {
            return None;
        }

        match self.transport.download_media(message).await {
            Ok(Some(media)) => {
                if let Err(reason) = self.validate_media(&media) {
                    warn!(reason, "downloaded media failed validation");
                    return None;
                }
                Some(media)
            }
            Ok(None) => {
                warn!("transport returned no media content");
                None
            }
            Err(e) => {
                error!(error = %e, "error downloading media");
                None
            }
        }
    }

    /// Retrieve the media attached to an inbound message and forward it to
    /// the analyzer.
    ///
    /// Only bytes that passed validation ever reach the analyzer; when the
    /// message has no retrievable media the analyzer is not invoked at all.
    pub async fn analyze_media(
        &self,
        analyzer: &dyn ImageAnalyzer,
        message: &InboundMessage,
    ) -> Option<String> {
        let media = self.download_media(message).await?;
        match analyzer.analyze(&media.data).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "media analysis failed");
                None
            }
        }
    }

    /// Chats known to the session; empty when not ready or on error.
    pub async fn list_chats(&self) -> Vec<ChatInfo> {
        if !self.is_ready() {
            return Vec::new();
        }
        match self.transport.list_chats().await {
            Ok(chats) => chats,
            Err(e) => {
                error!(error = %e, "error listing chats");
                Vec::new()
            }
        }
    }

    pub async fn chat_by_id(&self, id: &str) -> Option<ChatInfo> {
        if !self.is_ready() {
            return None;
        }
        match self.transport.chat_by_id(id).await {
            Ok(chat) => Some(chat),
            Err(e) => {
                error!(chat_id = id, error = %e, "error fetching chat");
                None
            }
        }
    }

    pub async fn contact_by_id(&self, id: &str) -> Option<ContactInfo> {
        if !self.is_ready() {
            return None;
        }
        match self.transport.contact_by_id(id).await {
            Ok(contact) => Some(contact),
            Err(e) => {
                error!(contact_id = id, error = %e, "error fetching contact");
                None
            }
        }
    }

    /// Supervisor loop: consumes transport lifecycle events until the event
    /// channel closes or the cancellation token fires.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<TransportEvent>,
        cancel: CancellationToken,
    ) {
        info!(transport = self.transport.name(), "delivery supervisor running");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            let effect = {
                                let mut machine =
                                    self.state.lock().expect("state machine lock poisoned");
                                machine.apply(&event)
                            };
                            self.execute(effect);
                        }
                        None => {
                            info!("transport event channel closed, supervisor exiting");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping supervisor");
                    break;
                }
            }
        }
    }

    fn execute(self: &Arc<Self>, effect: Effect) {
        match effect {
            Effect::None => {}

            Effect::SurfacePairing(data) => {
                let rendered = pairing::render_challenge(&data);
                info!("pairing challenge received, scan to authenticate:\n{rendered}");
            }

            Effect::StartDrain => {
                let service = Arc::clone(self);
                tokio::spawn(service.drain_queue());
            }

            Effect::ScheduleRestart { delay } => {
                self.spawn_restart(delay);
            }

            Effect::SurfacePairingThenRestart { data, delay } => {
                let rendered = pairing::render_challenge(&data);
                info!("pairing challenge received, scan to authenticate:\n{rendered}");
                self.spawn_restart(delay);
            }

            Effect::GiveUp => {
                error!("automatic recovery exhausted, manual intervention required");
            }
        }
    }

    /// Tear down and reconnect the transport after `delay`, off the
    /// supervisor task so lifecycle events keep flowing during the backoff.
    fn spawn_restart(self: &Arc<Self>, delay: Duration) {
        warn!(
            delay_ms = delay.as_millis() as u64,
            "restarting transport session"
        );
        let service = Arc::clone(self);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = service.transport.destroy().await {
                warn!(error = %e, "error tearing down session before restart");
            }
            match service.transport.connect().await {
                Ok(()) => {
                    service
                        .state
                        .lock()
                        .expect("state machine lock poisoned")
                        .mark_initializing();
                }
                Err(e) => {
                    error!(error = %e, "transport reconnect failed");
                }
            }
        });
    }

    /// Drain the queue while the connection stays Ready.
    ///
    /// Single-flight: signalling a drain while one is running is a no-op.
    /// Queued items are delivered with retries suppressed — they already
    /// waited through an outage, and a failed drain attempt drops the item.
    async fn drain_queue(self: Arc<Self>) {
        if self.draining.swap(true, Ordering::SeqCst) {
            debug!("drain already in progress");
            return;
        }

        debug!(queue_len = self.queue.len(), "draining delivery queue");

        'drain: loop {
            if !self.is_ready() {
                break;
            }

            let batch = self.queue.dequeue_ready();
            if batch.is_empty() {
                break;
            }

            let mut pending = batch.into_iter();
            while let Some(item) = pending.next() {
                if !self.is_ready() {
                    let mut remainder = vec![item];
                    remainder.extend(pending);
                    info!(
                        requeued = remainder.len(),
                        "connection lost mid-drain, items kept for next drain"
                    );
                    self.queue.requeue_front(remainder);
                    break 'drain;
                }

                let QueuedItem {
                    recipient,
                    payload,
                    options,
                    ..
                } = item;
                let options = DeliveryOptions {
                    suppress_retry: true,
                    ..options
                };

                match payload {
                    QueuedPayload::Text(body) => {
                        self.send_message(&recipient, &body, options).await;
                    }
                    QueuedPayload::Media { media, caption } => {
                        self.send_media(
                            &recipient,
                            MediaSource::Payload(media),
                            caption.as_deref(),
                            options,
                        )
                        .await;
                    }
                }

                sleep(Duration::from_millis(
                    self.config.delivery.inter_message_delay_ms,
                ))
                .await;
            }
        }

        self.draining.store(false, Ordering::SeqCst);
        debug!(queue_len = self.queue.len(), "delivery queue drain finished");
    }

    /// Normalize any accepted media source to a single payload.
    async fn normalize_media(&self, source: MediaSource) -> Result<MediaPayload, CourierError> {
        match source {
            MediaSource::Payload(media) => Ok(media),

            MediaSource::Bytes {
                data,
                mimetype,
                filename,
            } => Ok(MediaPayload {
                mimetype: mimetype.unwrap_or_else(|| "image/jpeg".to_string()),
                filename: filename.unwrap_or_else(|| "image.jpg".to_string()),
                data,
            }),

            MediaSource::Path(path) => {
                let data = tokio::fs::read(&path).await.map_err(|e| {
                    CourierError::Media(format!("cannot read {}: {e}", path.display()))
                })?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "file".to_string());
                Ok(MediaPayload {
                    mimetype: mimetype_for(&path),
                    filename,
                    data,
                })
            }
        }
    }

    /// Check a payload against the configured allow-list and size limit.
    ///
    /// Returns the rejection reason so drops are traceable in logs.
    fn validate_media(&self, media: &MediaPayload) -> Result<(), String> {
        let format = media
            .format()
            .ok_or_else(|| format!("malformed mimetype `{}`", media.mimetype))?;

        if !self
            .config
            .media
            .supported_formats
            .iter()
            .any(|f| f == format)
        {
            return Err(format!("unsupported format `{format}`"));
        }

        if media.data.len() > self.config.media.max_file_size {
            return Err(format!(
                "size {} exceeds limit {}",
                media.data.len(),
                self.config.media.max_file_size
            ));
        }

        Ok(())
    }
}

/// Derive a mimetype from a file extension.
fn mimetype_for(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
    .to_string()
}
