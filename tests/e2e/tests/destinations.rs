//! Destination handling end to end: topic fan-out, reply-to stamping,
//! per-message routing overrides, and the construction failures a bad
//! destination setup must produce.

use std::sync::Arc;

use broker::{BrokerSession, Destination, DestinationKind, MemoryBroker};
use broker_sink::{BrokerSink, OutboundMessage, OutboundMetadata, SinkConfig, SinkError};
use broker_sink_e2e_tests::init_tracing;
use futures::stream;
use serde_json::json;

#[tokio::test]
async fn topic_fans_out_to_every_subscriber() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(
        r#"
        destination = "my-topic"
        destination-type = "topic"
        "#,
    )?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;

    let topic = Destination::topic("my-topic");
    let first_subscriber = broker.consumer(&topic)?;
    let second_subscriber = broker.consumer(&topic)?;

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

    let first = first_subscriber.drain();
    let second = second_subscriber.drain();
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 10);
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.body, b.body);
        assert_eq!(a.message_id, b.message_id);
    }
    Ok(())
}

#[tokio::test]
async fn reply_to_queue_is_stamped_on_delivery() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(
        r#"
        destination = "queue-one"
        reply-to = "my-response"
        "#,
    )?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;
    let consumer = broker.consumer(&Destination::queue("queue-one"))?;

    let (message, done) = OutboundMessage::new("ping");
    let handle = sink.spawn(stream::iter(vec![message]));
    done.await?;
    handle.join().await;

    let delivered = consumer.try_recv().unwrap();
    assert_eq!(delivered.reply_to, Some(Destination::queue("my-response")));
    Ok(())
}

#[tokio::test]
async fn reply_to_topic_is_stamped_on_delivery() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let config = SinkConfig::from_toml(
        r#"
        destination = "queue-one"
        reply-to = "my-response"
        reply-to-destination-type = "topic"
        "#,
    )?;
    let sink = BrokerSink::with_defaults(broker.clone(), config)?;
    let consumer = broker.consumer(&Destination::queue("queue-one"))?;

    let (message, done) = OutboundMessage::new("ping");
    let handle = sink.spawn(stream::iter(vec![message]));
    done.await?;
    handle.join().await;

    let delivered = consumer.try_recv().unwrap();
    assert_eq!(delivered.reply_to, Some(Destination::topic("my-response")));
    Ok(())
}

#[tokio::test]
async fn invalid_reply_to_type_fails_before_any_message() {
    init_tracing();
    let err = SinkConfig::from_toml(
        r#"
        destination = "queue-one"
        reply-to = "my-response"
        reply-to-destination-type = "invalid"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, SinkError::Configuration(_)));
}

#[tokio::test]
async fn destination_kind_conflict_fails_construction() {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    broker.create_topic("orders").unwrap();

    let err = BrokerSink::with_defaults(broker, SinkConfig::queue("orders")).unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn metadata_overrides_route_a_single_message() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let sink = BrokerSink::with_defaults(broker.clone(), SinkConfig::queue("orders"))?;
    let orders = broker.consumer(&Destination::queue("orders"))?;

    let (diverted, diverted_done) = OutboundMessage::new("audit this");
    let diverted = diverted.with_metadata(
        OutboundMetadata::new()
            .with_destination("audit")
            .with_destination_kind(DestinationKind::Queue)
            .with_correlation_id("override-correlation")
            .with_property("origin", "audit-test"),
    );
    let (plain, plain_done) = OutboundMessage::new("business as usual");

    let handle = sink.spawn(stream::iter(vec![diverted, plain]));
    diverted_done.await?;
    plain_done.await?;
    handle.join().await;

    let audit = broker.consumer(&Destination::queue("audit"))?;
    let audited = audit.try_recv().unwrap();
    assert_eq!(audited.body.as_text(), Some("audit this"));
    assert_eq!(
        audited.correlation_id.as_deref(),
        Some("override-correlation")
    );
    assert_eq!(audited.property("origin"), Some("audit-test"));

    let routine = orders.try_recv().unwrap();
    assert_eq!(routine.body.as_text(), Some("business as usual"));
    assert!(routine.correlation_id.is_none());
    assert!(orders.try_recv().is_none());
    Ok(())
}
