//! Payload encoding seam.
//!
//! Structured payloads are serialized into text message bodies through a
//! [`PayloadCodec`], JSON by default. A codec failure fails only the message
//! being translated.

use crate::error::SinkError;

/// Encodes structured payloads into text message bodies
pub trait PayloadCodec: Send + Sync + std::fmt::Debug {
    /// Serialize `value` into the text body of an outgoing message
    fn encode(&self, value: &serde_json::Value) -> Result<String, SinkError>;
}

/// Default codec: compact JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode(&self, value: &serde_json::Value) -> Result<String, SinkError> {
        serde_json::to_string(value).map_err(|err| SinkError::codec(err.to_string()))
    }
}
