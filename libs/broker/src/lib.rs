pub mod destination;
pub mod error;
pub mod memory;
pub mod message;
pub mod options;

pub use destination::{Destination, DestinationKind};
pub use error::BrokerError;
pub use memory::{MemoryBroker, MemoryConsumer};
pub use message::{BrokerMessage, MessageBody};
pub use options::{DeliveryMode, SendOptions, DEFAULT_PRIORITY};

/// Milliseconds since the Unix epoch
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An open session to a queue/topic message broker.
///
/// Sessions are shared read-mostly across channels behind an `Arc`.
/// `send` is a blocking network call: callers on an async runtime must move
/// it onto a worker thread rather than invoking it from a runtime thread.
pub trait BrokerSession: Send + Sync + std::fmt::Debug {
    /// Resolve or create a point-to-point destination
    fn create_queue(&self, name: &str) -> Result<Destination, BrokerError>;

    /// Resolve or create a publish/subscribe destination
    fn create_topic(&self, name: &str) -> Result<Destination, BrokerError>;

    /// Resolve or create a destination of the given kind
    fn create_destination(
        &self,
        name: &str,
        kind: DestinationKind,
    ) -> Result<Destination, BrokerError> {
        match kind {
            DestinationKind::Queue => self.create_queue(name),
            DestinationKind::Topic => self.create_topic(name),
        }
    }

    /// Transmit one message, applying `options` atomically with this call.
    ///
    /// Blocks until the broker accepts or rejects the message. Fan-out for
    /// topic destinations is the broker's responsibility; one call publishes
    /// one logical message.
    fn send(
        &self,
        destination: &Destination,
        message: BrokerMessage,
        options: &SendOptions,
    ) -> Result<(), BrokerError>;
}
