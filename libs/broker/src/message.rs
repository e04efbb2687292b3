//! The broker-native message object.
//!
//! A [`BrokerMessage`] is built by the producer side, handed to a session's
//! send call exactly once, and discarded. Identity fields (`message_id`,
//! `timestamp_ms`, `priority`, `delivery_mode`, `expires_at_ms`) belong to the
//! send operation: the broker stamps them from [`SendOptions`] at send time,
//! so the delivered copy differs from the one the producer built.

use std::collections::HashMap;

use crate::destination::Destination;
use crate::options::{DeliveryMode, SendOptions};

/// Message body in one of the two wire encodings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Text-native message
    Text(String),
    /// Binary-native message
    Bytes(Vec<u8>),
}

impl MessageBody {
    /// Body size in bytes
    pub fn len(&self) -> usize {
        match self {
            MessageBody::Text(text) => text.len(),
            MessageBody::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text content, if this is a text body
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageBody::Text(text) => Some(text),
            MessageBody::Bytes(_) => None,
        }
    }

    /// Raw bytes of either body form
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MessageBody::Text(text) => text.as_bytes(),
            MessageBody::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerMessage {
    pub body: MessageBody,

    /// Application-set id linking request/response pairs
    pub correlation_id: Option<String>,

    /// Where a response to this message should be sent
    pub reply_to: Option<Destination>,

    /// Application string properties
    pub properties: HashMap<String, String>,

    /// Broker-assigned identifier, absent when suppressed for the send
    pub message_id: Option<String>,

    /// Broker-assigned send time in ms since epoch, 0 when suppressed
    pub timestamp_ms: i64,

    /// Delivery priority 0-9
    pub priority: u8,

    pub delivery_mode: DeliveryMode,

    /// Expiry in ms since epoch, 0 means the message never expires
    pub expires_at_ms: i64,
}

impl BrokerMessage {
    fn with_body(body: MessageBody) -> Self {
        Self {
            body,
            correlation_id: None,
            reply_to: None,
            properties: HashMap::new(),
            message_id: None,
            timestamp_ms: 0,
            priority: crate::options::DEFAULT_PRIORITY,
            delivery_mode: DeliveryMode::default(),
            expires_at_ms: 0,
        }
    }

    /// Create a text-native message
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_body(MessageBody::Text(body.into()))
    }

    /// Create a binary-native message
    pub fn bytes(body: Vec<u8>) -> Self {
        Self::with_body(MessageBody::Bytes(body))
    }

    /// Set correlation id
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set reply-to destination
    pub fn with_reply_to(mut self, destination: Destination) -> Self {
        self.reply_to = Some(destination);
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

    /// Body size in bytes
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Whether the message's ttl has elapsed at `now_ms`
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms > 0 && now_ms >= self.expires_at_ms
    }

    /// Apply the send-time fields a broker assigns for one send invocation
    pub fn stamped(mut self, options: &SendOptions, now_ms: i64) -> Self {
        self.delivery_mode = options.delivery_mode;
        self.priority = options.effective_priority();
        self.message_id = if options.disable_message_id {
            None
        } else {
            Some(uuid::Uuid::new_v4().to_string())
        };
        self.timestamp_ms = if options.disable_message_timestamp {
            0
        } else {
            now_ms
        };
        self.expires_at_ms = match options.ttl_ms {
            Some(ttl_ms) if ttl_ms > 0 => now_ms + ttl_ms,
            _ => 0,
        };
        self
    }
}
