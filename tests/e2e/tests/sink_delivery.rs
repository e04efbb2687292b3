//! Delivery behavior of a configured sink against a live in-memory broker:
//! default settings, delivery delay, identity suppression, and the
//! correlation/priority/ttl headers.

use std::sync::Arc;

use broker::{DeliveryMode, Destination, MemoryBroker, DEFAULT_PRIORITY};
use broker_sink::{BrokerSink, OutboundMessage, SinkConfig};
use broker_sink_e2e_tests::{await_until, init_tracing};
use futures::stream;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn payloads_reach_the_default_queue() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(r#"destination = "queue-one""#)?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;
    let consumer = broker.consumer(&Destination::queue("queue-one"))?;

    let mut messages = Vec::new();
    let mut completions = Vec::new();
    for i in 0..10 {
        let (message, done) = OutboundMessage::new(json!(i));
        messages.push(message);
        completions.push(done);
    }
    let handle = sink.spawn(stream::iter(messages));
    for done in completions {
        done.await?;
    }
    handle.join().await;

    let delivered = consumer.drain();
    assert_eq!(delivered.len(), 10);
    for (i, message) in delivered.iter().enumerate() {
        assert_eq!(message.body.as_text(), Some(i.to_string().as_str()));
        assert!(message.message_id.is_some());
        assert!(message.timestamp_ms > 0);
        assert_eq!(message.priority, DEFAULT_PRIORITY);
        assert_eq!(message.delivery_mode, DeliveryMode::Persistent);
        assert_eq!(message.expires_at_ms, 0);
    }
    tracing::info!(count = delivered.len(), "default delivery verified");
    Ok(())
}

#[tokio::test]
async fn delivery_delay_withholds_messages() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(
        r#"
        destination = "queue-one"
        delivery-delay = 1500
        delivery-mode = "non_persistent"
        "#,
    )?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;
    let consumer = broker.consumer(&Destination::queue("queue-one"))?;

    let sent_at = std::time::Instant::now();
    let (message, done) = OutboundMessage::new("delayed");
    let handle = sink.spawn(stream::iter(vec![message]));
    done.await?;

    assert!(
        consumer.try_recv().is_none(),
        "message visible before its delay elapsed"
    );

    let mut delivered = None;
    let arrived = await_until(|| match consumer.try_recv() {
        Some(message) => {
            delivered = Some(message);
            true
        }
        None => false,
    })
    .await;
    assert!(arrived, "message never became visible");
    assert!(sent_at.elapsed() >= Duration::from_millis(1000));

    let message = delivered.unwrap();
    assert_eq!(message.delivery_mode, DeliveryMode::NonPersistent);
    assert!(message.message_id.is_some());
    assert!(message.timestamp_ms > 0);

    handle.join().await;
    Ok(())
}

#[tokio::test]
async fn identity_stamping_can_be_disabled() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(
        r#"
        destination = "queue-one"
        disable-message-id = true
        disable-message-timestamp = true
        "#,
    )?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;
    let consumer = broker.consumer(&Destination::queue("queue-one"))?;

    let (message, done) = OutboundMessage::new("anonymous");
    let handle = sink.spawn(stream::iter(vec![message]));
    done.await?;
    handle.join().await;

    let delivered = consumer.try_recv().unwrap();
    assert!(delivered.message_id.is_none());
    assert_eq!(delivered.timestamp_ms, 0);
    Ok(())
}

#[tokio::test]
async fn correlation_priority_and_ttl_are_stamped() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(
        r#"
        destination = "queue-one"
        correlation-id = "my-correlation"
        priority = 5
        ttl = 1000
        "#,
    )?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;
    let consumer = broker.consumer(&Destination::queue("queue-one"))?;

    let (message, done) = OutboundMessage::new("tracked");
    let handle = sink.spawn(stream::iter(vec![message]));
    done.await?;
    handle.join().await;

    let delivered = consumer.try_recv().unwrap();
    assert_eq!(delivered.correlation_id.as_deref(), Some("my-correlation"));
    assert_eq!(delivered.priority, 5);
    assert_eq!(delivered.expires_at_ms, delivered.timestamp_ms + 1000);
    Ok(())
}

#[tokio::test]
async fn expired_messages_are_never_delivered() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(
        r#"
        destination = "queue-one"
        ttl = 50
        "#,
    )?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;
    let consumer = broker.consumer(&Destination::queue("queue-one"))?;

    let (message, done) = OutboundMessage::new("short lived");
    let handle = sink.spawn(stream::iter(vec![message]));
    done.await?;
    handle.join().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(consumer.try_recv().is_none());
    Ok(())
}
