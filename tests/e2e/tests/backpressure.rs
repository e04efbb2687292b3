//! Flow control end to end: strict per-sink ordering, the bounded send
//! pool, failure isolation, and shutdown draining.

use std::sync::Arc;
use std::time::Duration;

use broker::{BrokerMessage, BrokerSession, MemoryBroker, SendOptions};
use broker_sink::{
    BrokerSink, JsonCodec, OutboundMessage, Publisher, PublisherConfig, SinkConfig,
    TranslatedMessage,
};
use broker_sink_e2e_tests::init_tracing;
use futures::future::join_all;
use futures::stream;

#[tokio::test]
async fn sink_awaits_each_outcome_before_the_next() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new().with_send_latency(Duration::from_millis(15)));
    let sink = BrokerSink::with_defaults(broker.clone(), SinkConfig::queue("orders"))?;
    let consumer = broker.consumer(&broker::Destination::queue("orders"))?;

    let messages: Vec<_> = (0..5)
        .map(|i| OutboundMessage::new(format!("m{}", i)).0)
        .collect();
    sink.spawn(stream::iter(messages)).join().await;

    assert_eq!(broker.max_concurrent_sends(), 1);
    let bodies: Vec<_> = consumer
        .drain()
        .into_iter()
        .map(|m| m.body.as_text().unwrap().to_string())
        .collect();
    assert_eq!(bodies, vec!["m0", "m1", "m2", "m3", "m4"]);
    Ok(())
}

#[tokio::test]
async fn publisher_pool_caps_concurrent_sends() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new().with_send_latency(Duration::from_millis(20)));
    let destination = broker.create_queue("orders")?;
    let publisher = Publisher::new(broker.clone(), PublisherConfig::new(2));

    let completions: Vec<_> = (0..8)
        .map(|i| {
            publisher.publish(TranslatedMessage {
                message: BrokerMessage::text(format!("m{}", i)),
                destination: destination.clone(),
                options: SendOptions::new(),
            })
        })
        .collect();
    for outcome in join_all(completions).await {
        outcome?;
    }

    assert_eq!(broker.sent_count(), 8);
    assert!(broker.max_concurrent_sends() <= 2);
    tracing::info!(
        peak = broker.max_concurrent_sends(),
        "pool bound held under load"
    );
    Ok(())
}

#[tokio::test]
async fn shared_publisher_bounds_all_channels() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new().with_send_latency(Duration::from_millis(20)));
    let publisher = Arc::new(Publisher::new(broker.clone(), PublisherConfig::new(2)));

    let mut handles = Vec::new();
    for channel in 0..4 {
        let sink = BrokerSink::new(
            broker.clone(),
            SinkConfig::queue(format!("orders-{}", channel)),
            Arc::new(JsonCodec),
            publisher.clone(),
        )?;
        let messages: Vec<_> = (0..3)
            .map(|i| OutboundMessage::new(format!("c{}m{}", channel, i)).0)
            .collect();
        handles.push(sink.spawn(stream::iter(messages)));
    }
    for handle in handles {
        handle.join().await;
    }

    assert_eq!(broker.sent_count(), 12);
    assert!(broker.max_concurrent_sends() <= 2);
    Ok(())
}

#[tokio::test]
async fn failed_sends_do_not_stall_the_stream() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new());
    let sink = BrokerSink::with_defaults(broker.clone(), SinkConfig::queue("orders"))?;
    broker.fail_next_send();

    let (doomed, doomed_done) = OutboundMessage::new("doomed");
    let mut messages = vec![doomed];
    let mut completions = Vec::new();
    for i in 0..4 {
        let (message, done) = OutboundMessage::new(format!("m{}", i));
        messages.push(message);
        completions.push(done);
    }

    let handle = sink.spawn(stream::iter(messages));
    assert!(doomed_done.await.unwrap_err().is_transport());
    for done in completions {
        done.await?;
    }

    let stats = handle.stats();
    assert_eq!(stats.accepted, 5);
    assert_eq!(stats.published, 4);
    assert_eq!(stats.failed, 1);
    handle.join().await;
    assert_eq!(broker.sent_count(), 4);
    Ok(())
}

#[tokio::test]
async fn shutdown_completes_in_flight_then_stops() -> anyhow::Result<()> {
    init_tracing();
    let broker = Arc::new(MemoryBroker::new().with_send_latency(Duration::from_millis(50)));
    let sink = BrokerSink::with_defaults(broker.clone(), SinkConfig::queue("orders"))?;

    let (tx, rx) = futures::channel::mpsc::unbounded();
    let handle = sink.spawn(rx);

    let (in_flight, in_flight_done) = OutboundMessage::new("in flight");
    tx.unbounded_send(in_flight).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (queued, queued_done) = OutboundMessage::new("never taken");
    tx.unbounded_send(queued).unwrap();
    handle.shutdown().await;

    in_flight_done.await?;
    assert!(queued_done.await.unwrap_err().is_closed());
    assert_eq!(broker.sent_count(), 1);
    drop(tx);
    Ok(())
}
