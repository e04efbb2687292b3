pub mod codec;
pub mod completion;
pub mod config;
pub mod destination;
pub mod error;
pub mod message;
pub mod publish;
pub mod stats;
pub mod subscriber;
pub mod test_utils;
pub mod translate;

pub use broker::current_timestamp_ms as send_timestamp_ms;
pub use codec::{JsonCodec, PayloadCodec};
pub use completion::Completion;
pub use config::SinkConfig;
pub use destination::DestinationResolver;
pub use error::SinkError;
pub use message::{OutboundMessage, OutboundMetadata, Payload};
pub use publish::{Publisher, PublisherConfig, DEFAULT_WORKERS};
pub use stats::{SinkStats, StatsSnapshot};
pub use subscriber::{BrokerSink, ShutdownHandle, SinkHandle, SinkState};
pub use translate::{MessageTranslator, TranslatedMessage};
