// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the delivery service against a mock transport.

use std::sync::Arc;
use std::time::Duration;

use courier_config::CourierConfig;
use courier_core::types::{
    DeliveryOptions, InboundMessage, MediaPayload, MediaSource, MessageId, Recipient, SelfInfo,
    TransportEvent,
};
use courier_core::{CourierError, ImageAnalyzer, Transport};
use courier_delivery::DeliveryService;
use courier_test_utils::{MockTransport, SentItem};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn test_config() -> CourierConfig {
    let mut config = CourierConfig::default();
    config.delivery.typing_delay_ms = 10;
    config.delivery.inter_message_delay_ms = 10;
    config.delivery.retry_delay_ms = 10;
    config.transport.restart_base_delay_ms = 100;
    config
}

fn service_with(
    transport: &Arc<MockTransport>,
    config: CourierConfig,
) -> Arc<DeliveryService> {
    DeliveryService::new(Arc::clone(transport) as Arc<dyn Transport>, config)
}

fn start_supervisor(
    service: &Arc<DeliveryService>,
) -> (mpsc::Sender<TransportEvent>, CancellationToken) {
    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    tokio::spawn(Arc::clone(service).run(rx, cancel.clone()));
    (tx, cancel)
}

fn ready_event() -> TransportEvent {
    TransportEvent::Ready(SelfInfo {
        display_name: "courier-bot".into(),
        user_id: "42".into(),
    })
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn no_typing() -> DeliveryOptions {
    DeliveryOptions {
        skip_typing: true,
        ..DeliveryOptions::default()
    }
}

fn png_payload(size: usize) -> MediaPayload {
    MediaPayload {
        mimetype: "image/png".into(),
        filename: "chart.png".into(),
        data: vec![0u8; size],
    }
}

#[tokio::test(start_paused = true)]
async fn not_ready_send_is_queued_then_drained_on_ready() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let r = Recipient("alice".into());

    let delivered = service.send_message(&r, "hi", no_typing()).await;
    assert!(!delivered);
    assert_eq!(service.status().queue_len, 1);
    assert_eq!(transport.sent_count(), 0);

    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();

    wait_until(|| service.status().queue_len == 0 && transport.sent_count() == 1).await;
    assert_eq!(transport.texts_to(&r), vec!["hi"]);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn ready_send_delivers_immediately_with_typing_indicator() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    let r = Recipient("alice".into());
    assert!(
        service
            .send_message(&r, "hello", DeliveryOptions::default())
            .await
    );

    let items = transport.sent_items();
    assert_eq!(items[0], SentItem::Typing { recipient: r.clone() });
    assert_eq!(transport.texts_to(&r), vec!["hello"]);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn second_send_within_window_is_rate_limited() {
    let mut config = test_config();
    config.rate_limit.per_recipient = 1;
    config.rate_limit.window_ms = 5_000;

    let transport = MockTransport::new();
    let service = service_with(&transport, config);
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    let r = Recipient("alice".into());
    assert!(service.send_message(&r, "first", no_typing()).await);
    assert!(!service.send_message(&r, "second", no_typing()).await);

    // Rejected, not queued.
    assert_eq!(service.status().queue_len, 0);
    assert_eq!(transport.texts_to(&r), vec!["first"]);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn long_body_is_delivered_as_three_chunks_in_order() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    let r = Recipient("alice".into());
    let body = "x".repeat(9_000);
    assert!(service.send_message(&r, &body, no_typing()).await);

    let chunks = transport.texts_to(&r);
    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(chunk.len() <= 4_000);
    }
    assert_eq!(chunks.concat(), body);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn trailing_newline_never_sends_an_empty_chunk() {
    let mut config = test_config();
    config.delivery.max_message_length = 100;

    let transport = MockTransport::new();
    let service = service_with(&transport, config);
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    // Hard-split line followed by a trailing newline; the splitter keeps an
    // empty chunk for join losslessness, but nothing empty goes on the wire.
    let r = Recipient("alice".into());
    let body = format!("{}\n", "x".repeat(150));
    assert!(service.send_message(&r, &body, no_typing()).await);

    let chunks = transport.texts_to(&r);
    assert!(chunks.iter().all(|c| !c.is_empty()));
    assert_eq!(chunks.concat(), "x".repeat(150));
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_within_budget() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    transport.fail_next_sends(2);
    let r = Recipient("alice".into());
    assert!(service.send_message(&r, "persistent", no_typing()).await);

    assert_eq!(transport.failed_send_count(), 2);
    assert_eq!(transport.texts_to(&r), vec!["persistent"]);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_return_false() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    // Initial attempt + 3 retries, all failing.
    transport.fail_next_sends(4);
    let r = Recipient("alice".into());
    assert!(!service.send_message(&r, "doomed", no_typing()).await);
    assert_eq!(transport.sent_count(), 0);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn suppressed_retry_fails_on_first_error() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    transport.fail_next_sends(1);
    let r = Recipient("alice".into());
    let opts = DeliveryOptions {
        suppress_retry: true,
        ..no_typing()
    };
    assert!(!service.send_message(&r, "once", opts).await);
    assert_eq!(transport.failed_send_count(), 1);
    assert_eq!(transport.sent_count(), 0);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn disconnect_flips_readiness_and_later_sends_queue() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    events
        .send(TransportEvent::Disconnected("NAVIGATION".into()))
        .await
        .unwrap();
    wait_until(|| !service.is_ready()).await;

    let r = Recipient("alice".into());
    assert!(!service.send_message(&r, "offline", no_typing()).await);
    assert_eq!(service.status().queue_len, 1);

    // The restart policy reconnects the transport.
    wait_until(|| transport.connect_calls() >= 1).await;
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn restart_backoff_does_not_block_event_processing() {
    let mut config = test_config();
    config.transport.restart_base_delay_ms = 60_000;

    let transport = MockTransport::new();
    let service = service_with(&transport, config);
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    events
        .send(TransportEvent::Disconnected("NAVIGATION".into()))
        .await
        .unwrap();
    wait_until(|| !service.is_ready()).await;

    // A Ready event arriving during the one-minute backoff must be applied
    // immediately, long before the reconnect task wakes up.
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;
    assert_eq!(transport.connect_calls(), 0);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn shutdown_clears_readiness_and_destroys_the_session() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    service.shutdown().await;
    assert!(!service.is_ready());
    assert_eq!(transport.destroy_calls(), 1);

    // Sends after shutdown queue instead of reaching the transport.
    let r = Recipient("alice".into());
    assert!(!service.send_message(&r, "late", no_typing()).await);
    assert_eq!(service.status().queue_len, 1);
    assert_eq!(transport.sent_count(), 0);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn stale_queued_items_are_dropped_not_sent() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let r = Recipient("alice".into());

    assert!(!service.send_message(&r, "ancient news", no_typing()).await);
    assert_eq!(service.status().queue_len, 1);

    // Default staleness window is five minutes.
    tokio::time::advance(Duration::from_secs(301)).await;

    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.status().queue_len == 0).await;

    assert_eq!(transport.sent_count(), 0);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn drained_items_are_not_retried_on_failure() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let r = Recipient("alice".into());

    assert!(!service.send_message(&r, "fragile", no_typing()).await);
    transport.fail_next_sends(1);

    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();

    // Single attempt, dropped on failure.
    wait_until(|| transport.failed_send_count() == 1).await;
    assert_eq!(service.status().queue_len, 0);
    assert_eq!(transport.sent_count(), 0);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn oversize_media_is_rejected_without_transport_or_queue() {
    let mut config = test_config();
    config.media.max_file_size = 1_024;

    let transport = MockTransport::new();
    let service = service_with(&transport, config);
    let r = Recipient("alice".into());

    let delivered = service
        .send_media(
            &r,
            MediaSource::Payload(png_payload(2_048)),
            None,
            no_typing(),
        )
        .await;

    assert!(!delivered);
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(service.status().queue_len, 0);
}

#[tokio::test(start_paused = true)]
async fn unsupported_format_is_rejected() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let r = Recipient("alice".into());

    let media = MediaPayload {
        mimetype: "image/tiff".into(),
        filename: "scan.tiff".into(),
        data: vec![0u8; 64],
    };
    let delivered = service
        .send_media(&r, MediaSource::Payload(media), None, no_typing())
        .await;

    assert!(!delivered);
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(service.status().queue_len, 0);
}

#[tokio::test(start_paused = true)]
async fn valid_media_is_sent_with_caption() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    let r = Recipient("alice".into());
    let delivered = service
        .send_media(
            &r,
            MediaSource::Bytes {
                data: vec![0u8; 64],
                mimetype: Some("image/png".into()),
                filename: Some("chart.png".into()),
            },
            Some("M15 analysis"),
            no_typing(),
        )
        .await;

    assert!(delivered);
    assert_eq!(
        transport.sent_items(),
        vec![SentItem::Media {
            recipient: r,
            mimetype: "image/png".into(),
            caption: Some("M15 analysis".into()),
        }]
    );
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn media_from_path_derives_mimetype_and_filename() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.png");
    std::fs::write(&path, vec![0u8; 32]).unwrap();

    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    let r = Recipient("alice".into());
    assert!(
        service
            .send_media(&r, MediaSource::Path(path), None, no_typing())
            .await
    );

    match &transport.sent_items()[0] {
        SentItem::Media { mimetype, .. } => assert_eq!(mimetype, "image/png"),
        other => panic!("unexpected item: {other:?}"),
    }
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn queued_media_is_delivered_on_drain() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let r = Recipient("alice".into());

    let delivered = service
        .send_media(
            &r,
            MediaSource::Payload(png_payload(64)),
            Some("later"),
            no_typing(),
        )
        .await;
    assert!(!delivered);
    assert_eq!(service.status().queue_len, 1);

    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.status().queue_len == 0 && transport.sent_count() == 1).await;

    match &transport.sent_items()[0] {
        SentItem::Media { caption, .. } => assert_eq!(caption.as_deref(), Some("later")),
        other => panic!("unexpected item: {other:?}"),
    }
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn download_media_returns_none_for_all_failure_modes() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());

    let mut message = InboundMessage {
        id: MessageId("m1".into()),
        sender: Recipient("alice".into()),
        body: String::new(),
        has_media: false,
    };

    // No media attached.
    assert!(service.download_media(&message).await.is_none());

    // Transport cannot produce content.
    message.has_media = true;
    transport.set_media_response(None);
    assert!(service.download_media(&message).await.is_none());

    // Content fails validation.
    transport.set_media_response(Some(MediaPayload {
        mimetype: "image/tiff".into(),
        filename: "scan.tiff".into(),
        data: vec![0u8; 16],
    }));
    assert!(service.download_media(&message).await.is_none());

    // Valid content comes through.
    transport.set_media_response(Some(png_payload(16)));
    let media = service.download_media(&message).await.unwrap();
    assert_eq!(media.mimetype, "image/png");
}

struct EchoAnalyzer;

#[async_trait::async_trait]
impl ImageAnalyzer for EchoAnalyzer {
    async fn analyze(&self, image: &[u8]) -> Result<Option<String>, CourierError> {
        Ok(Some(format!("{} bytes", image.len())))
    }
}

#[tokio::test(start_paused = true)]
async fn analyzer_only_sees_validated_media() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());
    let analyzer = EchoAnalyzer;

    let message = InboundMessage {
        id: MessageId("m2".into()),
        sender: Recipient("alice".into()),
        body: String::new(),
        has_media: true,
    };

    // Unsupported content never reaches the analyzer.
    transport.set_media_response(Some(MediaPayload {
        mimetype: "image/tiff".into(),
        filename: "scan.tiff".into(),
        data: vec![0u8; 16],
    }));
    assert!(service.analyze_media(&analyzer, &message).await.is_none());

    transport.set_media_response(Some(png_payload(32)));
    assert_eq!(
        service.analyze_media(&analyzer, &message).await.as_deref(),
        Some("32 bytes")
    );
}

#[tokio::test(start_paused = true)]
async fn fifo_order_survives_queueing_across_recipients() {
    let transport = MockTransport::new();
    let service = service_with(&transport, test_config());

    let alice = Recipient("alice".into());
    let bob = Recipient("bob".into());
    service.send_message(&alice, "one", no_typing()).await;
    service.send_message(&bob, "two", no_typing()).await;
    service.send_message(&alice, "three", no_typing()).await;
    assert_eq!(service.status().queue_len, 3);

    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.status().queue_len == 0 && transport.sent_count() == 3).await;

    let bodies: Vec<String> = transport
        .sent_items()
        .into_iter()
        .filter_map(|item| match item {
            SentItem::Text { body, .. } => Some(body),
            _ => None,
        })
        .collect();
    assert_eq!(bodies, vec!["one", "two", "three"]);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn chat_lookups_are_empty_until_ready() {
    let transport = MockTransport::new();
    transport.set_chats(vec![courier_core::types::ChatInfo {
        id: "group-1".into(),
        name: Some("signals".into()),
        is_group: true,
    }]);
    let service = service_with(&transport, test_config());

    assert!(service.list_chats().await.is_empty());
    assert!(service.chat_by_id("group-1").await.is_none());

    let (events, cancel) = start_supervisor(&service);
    events.send(ready_event()).await.unwrap();
    wait_until(|| service.is_ready()).await;

    assert_eq!(service.list_chats().await.len(), 1);
    assert_eq!(
        service.chat_by_id("group-1").await.unwrap().name.as_deref(),
        Some("signals")
    );
    cancel.cancel();
}
