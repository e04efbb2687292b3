//! Outbound stream elements.
//!
//! An [`OutboundMessage`] wraps one logical payload, optional per-message
//! delivery overrides, and the acknowledgment continuation its producer is
//! awaiting. `ack`/`nack` consume the message, so the continuation fires
//! exactly once on exactly one path.

use std::collections::HashMap;

use broker::DestinationKind;

use crate::completion::{Completion, CompletionSender};
use crate::error::SinkError;

/// Logical payload of one outbound element.
///
/// The payload type alone decides the wire encoding: text and bytes pass
/// through untouched, structured values go through the channel's codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Delivered as a text-native message, byte-for-byte
    Text(String),
    /// Serialized through the channel's codec into a text-native message
    Json(serde_json::Value),
    /// Delivered as a binary-native message
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Json(_) => "json",
            Payload::Bytes(_) => "bytes",
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(value)
    }
}

/// Per-message delivery overrides.
///
/// Set fields win over channel configuration for that single message; unset
/// fields fall back to the channel defaults. Destination and reply-to kinds
/// default to the channel's configured kinds when only a name is given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMetadata {
    pub destination: Option<String>,
    pub destination_kind: Option<DestinationKind>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub reply_to_kind: Option<DestinationKind>,
    pub properties: HashMap<String, String>,
}

impl OutboundMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route this message to a different destination
    pub fn with_destination(mut self, name: impl Into<String>) -> Self {
        self.destination = Some(name.into());
        self
    }

    /// Kind of the override destination
    pub fn with_destination_kind(mut self, kind: DestinationKind) -> Self {
        self.destination_kind = Some(kind);
        self
    }

    /// Set correlation id for this message
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set reply-to destination for this message
    pub fn with_reply_to(mut self, name: impl Into<String>) -> Self {
        self.reply_to = Some(name.into());
        self
    }

    /// Kind of the override reply-to destination
    pub fn with_reply_to_kind(mut self, kind: DestinationKind) -> Self {
        self.reply_to_kind = Some(kind);
        self
    }

    /// Add one application property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up an application property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// One element of the upstream stream
#[derive(Debug)]
pub struct OutboundMessage {
    payload: Payload,
    metadata: OutboundMetadata,
    completion: CompletionSender,
}

impl OutboundMessage {
    /// Create a message and the completion its producer can await
    pub fn new(payload: impl Into<Payload>) -> (Self, Completion) {
        let (sender, completion) = Completion::channel();
        (
            Self {
                payload: payload.into(),
                metadata: OutboundMetadata::default(),
                completion: sender,
            },
            completion,
        )
    }

    /// Attach per-message overrides
    pub fn with_metadata(mut self, metadata: OutboundMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn metadata(&self) -> &OutboundMetadata {
        &self.metadata
    }

    /// Look up a per-message property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.metadata.property(key)
    }

    /// Signal that the broker accepted this message
    pub fn ack(self) {
        self.completion.resolve(Ok(()));
    }

    /// Signal failure to the producer, which owns any retry policy
    pub fn nack(self, error: SinkError) {
        self.completion.resolve(Err(error));
    }
}
