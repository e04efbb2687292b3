//! In-process broker session with real queue and topic semantics.
//!
//! Backs integration tests and local development without an external broker.
//! Delivery behavior mirrors what the connector relies on in production:
//!
//! - **Queues** hold messages in FIFO order; consumers on the same queue
//!   compete, each message is delivered once.
//! - **Topics** fan a message out to every subscriber registered at send
//!   time; a topic with no subscribers drops the message.
//! - **Delivery delay** keeps a message invisible to consumers until the
//!   configured deadline; **ttl** expires undelivered messages.
//! - Send stamps id, timestamp, priority, mode, and expiry from the
//!   [`SendOptions`] of that one invocation.
//!
//! Instrumentation hooks (`with_send_latency`, `fail_next_send`,
//! `set_fail_sends`, `max_concurrent_sends`) let tests exercise the
//! blocking-transport and failure paths deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::destination::{Destination, DestinationKind};
use crate::error::BrokerError;
use crate::message::BrokerMessage;
use crate::options::SendOptions;
use crate::{current_timestamp_ms, BrokerSession};

#[derive(Debug)]
struct StoredMessage {
    message: BrokerMessage,
    visible_at_ms: i64,
}

type Buffer = Arc<Mutex<VecDeque<StoredMessage>>>;

#[derive(Debug, Clone)]
enum Node {
    Queue(Buffer),
    Topic(Arc<Mutex<Vec<Buffer>>>),
}

impl Node {
    fn new(kind: DestinationKind) -> Self {
        match kind {
            DestinationKind::Queue => Node::Queue(Buffer::default()),
            DestinationKind::Topic => Node::Topic(Arc::default()),
        }
    }

    fn kind(&self) -> DestinationKind {
        match self {
            Node::Queue(_) => DestinationKind::Queue,
            Node::Topic(_) => DestinationKind::Topic,
        }
    }
}

/// In-memory [`BrokerSession`] implementation
#[derive(Debug, Default)]
pub struct MemoryBroker {
    nodes: Mutex<HashMap<String, Node>>,
    send_latency: Mutex<Option<Duration>>,
    fail_next: AtomicBool,
    fail_all: AtomicBool,
    closed: AtomicBool,
    sent: AtomicU64,
    concurrent_sends: AtomicUsize,
    max_concurrent_sends: AtomicUsize,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate network latency: every send blocks for `latency`
    pub fn with_send_latency(self, latency: Duration) -> Self {
        *self.send_latency.lock() = Some(latency);
        self
    }

    /// Fail exactly the next send with a transport error
    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Fail every send until reset
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Reject all further operations with `SessionClosed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of successful sends
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    /// Highest number of sends observed in flight at once
    pub fn max_concurrent_sends(&self) -> usize {
        self.max_concurrent_sends.load(Ordering::SeqCst)
    }

    /// Attach a consumer to a destination, creating it if needed.
    ///
    /// Topic subscribers only observe messages sent after they attach.
    pub fn consumer(&self, destination: &Destination) -> Result<MemoryConsumer, BrokerError> {
        let buffer = match self.node(&destination.name, destination.kind)? {
            Node::Queue(buffer) => buffer,
            Node::Topic(subscribers) => {
                let buffer = Buffer::default();
                subscribers.lock().push(Arc::clone(&buffer));
                buffer
            }
        };
        Ok(MemoryConsumer {
            destination: destination.clone(),
            buffer,
        })
    }

    fn node(&self, name: &str, kind: DestinationKind) -> Result<Node, BrokerError> {
        let mut nodes = self.nodes.lock();
        if let Some(node) = nodes.get(name) {
            if node.kind() != kind {
                return Err(BrokerError::destination_conflict(name, node.kind()));
            }
            return Ok(node.clone());
        }
        let node = Node::new(kind);
        nodes.insert(name.to_string(), node.clone());
        debug!(name, kind = %kind, "created destination");
        Ok(node)
    }

    fn create(&self, name: &str, kind: DestinationKind) -> Result<Destination, BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::SessionClosed);
        }
        self.node(name, kind)?;
        Ok(Destination::new(name, kind))
    }
}

impl BrokerSession for MemoryBroker {
    fn create_queue(&self, name: &str) -> Result<Destination, BrokerError> {
        self.create(name, DestinationKind::Queue)
    }

    fn create_topic(&self, name: &str) -> Result<Destination, BrokerError> {
        self.create(name, DestinationKind::Topic)
    }

    fn send(
        &self,
        destination: &Destination,
        message: BrokerMessage,
        options: &SendOptions,
    ) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::SessionClosed);
        }
        if self.fail_next.swap(false, Ordering::SeqCst) || self.fail_all.load(Ordering::SeqCst) {
            return Err(BrokerError::send_rejected("injected transport failure"));
        }
        let node = self.node(&destination.name, destination.kind)?;

        let in_flight = self.concurrent_sends.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_sends.fetch_max(in_flight, Ordering::SeqCst);
        let latency = *self.send_latency.lock();
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }

        let now_ms = current_timestamp_ms();
        let message = message.stamped(options, now_ms);
        let visible_at_ms = now_ms + options.delivery_delay_ms.unwrap_or(0).max(0);

        match node {
            Node::Queue(buffer) => {
                buffer.lock().push_back(StoredMessage {
                    message,
                    visible_at_ms,
                });
            }
            Node::Topic(subscribers) => {
                let subscribers = subscribers.lock();
                if subscribers.is_empty() {
                    debug!(destination = %destination, "no subscribers, message dropped");
                }
                for buffer in subscribers.iter() {
                    buffer.lock().push_back(StoredMessage {
                        message: message.clone(),
                        visible_at_ms,
                    });
                }
            }
        }

        self.sent.fetch_add(1, Ordering::SeqCst);
        self.concurrent_sends.fetch_sub(1, Ordering::SeqCst);
        trace!(destination = %destination, "message accepted");
        Ok(())
    }
}

/// Consumer handle returned by [`MemoryBroker::consumer`]
#[derive(Debug)]
pub struct MemoryConsumer {
    destination: Destination,
    buffer: Buffer,
}

impl MemoryConsumer {
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Take the next visible, unexpired message.
    ///
    /// Expired messages encountered during the scan are discarded.
    pub fn try_recv(&self) -> Option<BrokerMessage> {
        let mut pending = self.buffer.lock();
        let now_ms = current_timestamp_ms();
        let mut index = 0;
        while index < pending.len() {
            if pending[index].message.is_expired(now_ms) {
                pending.remove(index);
                continue;
            }
            if pending[index].visible_at_ms <= now_ms {
                return pending.remove(index).map(|stored| stored.message);
            }
            index += 1;
        }
        None
    }

    /// Take every currently visible message, in delivery order
    pub fn drain(&self) -> Vec<BrokerMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Count of messages a `try_recv` could return right now
    pub fn visible_len(&self) -> usize {
        let pending = self.buffer.lock();
        let now_ms = current_timestamp_ms();
        pending
            .iter()
            .filter(|stored| {
                stored.visible_at_ms <= now_ms && !stored.message.is_expired(now_ms)
            })
            .count()
    }
}
