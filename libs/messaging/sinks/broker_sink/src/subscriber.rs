//! Stream subscriber driving the publish pipeline.
//!
//! [`BrokerSink`] consumes a stream of [`OutboundMessage`]s and publishes
//! each one through the translator and publisher. Dispatch is strictly
//! one-at-a-time: the sink awaits the completion of the current message
//! before taking the next stream element, so upstream backpressure follows
//! broker throughput and at most one send is outstanding per sink.
//!
//! ## Failure handling
//!
//! A message that fails translation or transport is nacked and the stream
//! keeps flowing. Only construction errors are fatal: a sink with an invalid
//! configuration is never built.
//!
//! ## Shutdown
//!
//! [`ShutdownHandle::shutdown`] stops intake between messages. A message
//! already handed to the publisher completes and its ack or nack still
//! fires. [`SinkHandle::join`] then drains the publisher, after which the
//! session can be released.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use broker::BrokerSession;
use futures::{Stream, StreamExt};
use num_enum::TryFromPrimitive;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::codec::{JsonCodec, PayloadCodec};
use crate::config::SinkConfig;
use crate::destination::DestinationResolver;
use crate::error::SinkError;
use crate::message::OutboundMessage;
use crate::publish::{Publisher, PublisherConfig};
use crate::stats::{SinkStats, StatsSnapshot};
use crate::translate::MessageTranslator;

/// Lifecycle state of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum SinkState {
    /// Waiting for the next stream element
    Idle = 0,
    /// A message is being translated or sent
    AwaitingSend = 1,
    /// The stream ended or shutdown was requested
    Closed = 2,
}

impl SinkState {
    /// Check if the sink still consumes its stream
    pub fn is_active(&self) -> bool {
        !matches!(self, SinkState::Closed)
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(SinkState::Idle as u8))
    }

    fn set(&self, state: SinkState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> SinkState {
        SinkState::try_from(self.0.load(Ordering::SeqCst)).unwrap_or(SinkState::Closed)
    }
}

/// Publishes a stream of outbound messages to one broker destination
#[derive(Debug)]
pub struct BrokerSink {
    config: Arc<SinkConfig>,
    translator: MessageTranslator,
    publisher: Arc<Publisher>,
    stats: Arc<SinkStats>,
    state: Arc<StateCell>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl BrokerSink {
    /// Create a sink over a broker session.
    ///
    /// Validates the configuration and resolves the send target and reply-to
    /// destination up front, so a misconfigured sink is never built. The
    /// publisher may be shared by several sinks; its worker bound then covers
    /// all of them together.
    pub fn new(
        session: Arc<dyn BrokerSession>,
        config: SinkConfig,
        codec: Arc<dyn PayloadCodec>,
        publisher: Arc<Publisher>,
    ) -> Result<Self, SinkError> {
        config.validate()?;
        let config = Arc::new(config);
        let resolver = Arc::new(DestinationResolver::new(session, config.clone()));
        resolver.send_target()?;
        resolver.reply_to()?;

        let translator = MessageTranslator::new(config.clone(), resolver, codec);
        let stats = publisher.stats_handle();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            destination = %config.destination,
            kind = %config.destination_type,
            "broker sink ready"
        );

        Ok(Self {
            config,
            translator,
            publisher,
            stats,
            state: Arc::new(StateCell::new()),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Create a sink with the JSON codec and its own default publisher
    pub fn with_defaults(
        session: Arc<dyn BrokerSession>,
        config: SinkConfig,
    ) -> Result<Self, SinkError> {
        let publisher = Arc::new(Publisher::new(session.clone(), PublisherConfig::default()));
        Self::new(session, config, Arc::new(JsonCodec), publisher)
    }

    /// The channel configuration this sink was built from
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> SinkState {
        self.state.get()
    }

    /// Current publish counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Handle for requesting shutdown from outside the sink task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Consume the stream until it ends or shutdown is requested.
    ///
    /// Each element is fully dispatched, including awaiting the broker
    /// outcome, before the next one is taken.
    pub async fn run(self, stream: impl Stream<Item = OutboundMessage>) {
        futures::pin_mut!(stream);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            self.state.set(SinkState::Idle);
            // Biased: once shutdown is signaled it must win over a ready
            // stream element, or an extra message slips through.
            let next = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!(destination = %self.config.destination, "shutdown requested");
                    break;
                }
                item = stream.next() => item,
            };
            let Some(message) = next else {
                info!(destination = %self.config.destination, "upstream completed");
                break;
            };

            self.stats.record_accepted();
            self.state.set(SinkState::AwaitingSend);
            self.dispatch(message).await;
        }

        self.state.set(SinkState::Closed);
        info!(
            destination = %self.config.destination,
            stats = ?self.stats.snapshot(),
            "broker sink stopped"
        );
    }

    /// Run the sink on a background task
    pub fn spawn(self, stream: impl Stream<Item = OutboundMessage> + Send + 'static) -> SinkHandle {
        let shutdown = ShutdownHandle(self.shutdown_tx.clone());
        let publisher = self.publisher.clone();
        let state = self.state.clone();
        let task = tokio::spawn(self.run(stream));
        SinkHandle {
            shutdown,
            publisher,
            state,
            task,
        }
    }

    async fn dispatch(&self, message: OutboundMessage) {
        let translated = match self.translator.translate(&message) {
            Ok(translated) => translated,
            Err(err) => {
                self.stats.record_failed();
                warn!(error = %err, "message failed translation");
                message.nack(err);
                return;
            }
        };
        match self.publisher.publish(translated).await {
            Ok(()) => message.ack(),
            Err(err) => {
                warn!(error = %err, "message failed to publish");
                message.nack(err);
            }
        }
    }
}

/// Requests sink shutdown without waiting for it
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    /// Signal the sink to stop after the current message
    pub fn shutdown(&self) {
        let _ = self.0.send(true);
    }
}

/// Handle to a spawned sink task
#[derive(Debug)]
pub struct SinkHandle {
    shutdown: ShutdownHandle,
    publisher: Arc<Publisher>,
    state: Arc<StateCell>,
    task: JoinHandle<()>,
}

impl SinkHandle {
    /// Request shutdown and wait for the sink to stop
    pub async fn shutdown(self) {
        self.shutdown.shutdown();
        self.join().await;
    }

    /// Wait for the sink task to finish and the publisher to drain
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!(error = %err, "sink task aborted");
        }
        self.publisher.drain().await;
    }

    /// Current lifecycle state
    pub fn state(&self) -> SinkState {
        self.state.get()
    }

    /// Check if the sink task has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Current publish counters
    pub fn stats(&self) -> StatsSnapshot {
        self.publisher.stats()
    }

    /// Shutdown handle usable from other tasks
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }
}
