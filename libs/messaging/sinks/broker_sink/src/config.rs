//! Per-channel delivery configuration.
//!
//! Built once at connector construction from a flat key/value document and
//! shared read-only by every publish afterwards. Recognized keys:
//!
//! | key                         | type        | default        |
//! |-----------------------------|-------------|----------------|
//! | `destination`               | string      | required       |
//! | `destination-type`          | queue/topic | `queue`        |
//! | `delivery-delay`            | int64 ms    | none           |
//! | `delivery-mode`             | persistent/non_persistent | `persistent` |
//! | `disable-message-id`        | bool        | `false`        |
//! | `disable-message-timestamp` | bool        | `false`        |
//! | `correlation-id`            | string      | none           |
//! | `priority`                  | int 0-9     | broker default |
//! | `ttl`                       | int64 ms    | none           |
//! | `reply-to`                  | string      | none           |
//! | `reply-to-destination-type` | queue/topic | `queue`        |
//!
//! Enum literals parse case-insensitively; an unrecognized literal fails
//! construction before any message flows. Unknown keys are ignored so channel
//! documents can carry connector-agnostic settings.

use std::path::Path;

use broker::{DeliveryMode, DestinationKind, SendOptions};
use serde::Deserialize;

use crate::error::SinkError;

/// Delivery settings for one channel
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Name of the destination messages are written to
    pub destination: String,

    /// Delivery model of the destination
    #[serde(rename = "destination-type", default)]
    pub destination_type: DestinationKind,

    /// Milliseconds the broker withholds each message from consumers
    #[serde(rename = "delivery-delay")]
    pub delivery_delay: Option<i64>,

    /// Persistence guarantee requested for every send
    #[serde(rename = "delivery-mode", default)]
    pub delivery_mode: DeliveryMode,

    /// Do not request a broker-assigned message id
    #[serde(rename = "disable-message-id", default)]
    pub disable_message_id: bool,

    /// Do not request a broker-assigned send timestamp
    #[serde(rename = "disable-message-timestamp", default)]
    pub disable_message_timestamp: bool,

    /// Correlation id stamped on every message unless overridden
    #[serde(rename = "correlation-id")]
    pub correlation_id: Option<String>,

    /// Delivery priority 0-9
    pub priority: Option<u8>,

    /// Message time-to-live in milliseconds
    pub ttl: Option<i64>,

    /// Destination responses should be sent to
    #[serde(rename = "reply-to")]
    pub reply_to: Option<String>,

    /// Delivery model of the reply-to destination
    #[serde(rename = "reply-to-destination-type", default)]
    pub reply_to_destination_type: DestinationKind,
}

impl SinkConfig {
    /// Configuration for a queue destination with all defaults
    pub fn queue(destination: impl Into<String>) -> Self {
        Self::bare(destination.into(), DestinationKind::Queue)
    }

    /// Configuration for a topic destination with all defaults
    pub fn topic(destination: impl Into<String>) -> Self {
        Self::bare(destination.into(), DestinationKind::Topic)
    }

    fn bare(destination: String, destination_type: DestinationKind) -> Self {
        Self {
            destination,
            destination_type,
            delivery_delay: None,
            delivery_mode: DeliveryMode::default(),
            disable_message_id: false,
            disable_message_timestamp: false,
            correlation_id: None,
            priority: None,
            ttl: None,
            reply_to: None,
            reply_to_destination_type: DestinationKind::default(),
        }
    }

    /// Parse and validate a TOML configuration document
    pub fn from_toml(input: &str) -> Result<Self, SinkError> {
        let config: SinkConfig =
            toml::from_str(input).map_err(|err| SinkError::configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SinkError::configuration(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_toml(&raw)
    }

    /// Build from an already-parsed key/value table
    pub fn from_value(value: toml::Value) -> Result<Self, SinkError> {
        let config: SinkConfig = value
            .try_into()
            .map_err(|err: toml::de::Error| SinkError::configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges not expressible in the type system
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.destination.trim().is_empty() {
            return Err(SinkError::configuration("destination must not be empty"));
        }
        if let Some(priority) = self.priority {
            if priority > 9 {
                return Err(SinkError::configuration(format!(
                    "priority {} out of range 0-9",
                    priority
                )));
            }
        }
        if let Some(delay) = self.delivery_delay {
            if delay < 0 {
                return Err(SinkError::configuration("delivery-delay must not be negative"));
            }
        }
        if let Some(ttl) = self.ttl {
            if ttl < 0 {
                return Err(SinkError::configuration("ttl must not be negative"));
            }
        }
        Ok(())
    }

    /// Immutable per-send options derived from this channel's settings
    pub fn send_options(&self) -> SendOptions {
        let mut options = SendOptions::new()
            .with_delivery_mode(self.delivery_mode)
            .with_message_id_disabled(self.disable_message_id)
            .with_timestamp_disabled(self.disable_message_timestamp);
        if let Some(priority) = self.priority {
            options = options.with_priority(priority);
        }
        if let Some(ttl) = self.ttl {
            options = options.with_ttl_ms(ttl);
        }
        if let Some(delay) = self.delivery_delay {
            options = options.with_delivery_delay_ms(delay);
        }
        options
    }

    /// Set delivery mode
    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    /// Set delivery delay in milliseconds
    pub fn with_delivery_delay(mut self, delay_ms: i64) -> Self {
        self.delivery_delay = Some(delay_ms);
        self
    }

    /// Set message time-to-live in milliseconds
    pub fn with_ttl(mut self, ttl_ms: i64) -> Self {
        self.ttl = Some(ttl_ms);
        self
    }

    /// Set delivery priority (0-9)
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the channel-level correlation id
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the reply-to destination name
    pub fn with_reply_to(mut self, name: impl Into<String>) -> Self {
        self.reply_to = Some(name.into());
        self
    }

    /// Set the reply-to destination kind
    pub fn with_reply_to_type(mut self, kind: DestinationKind) -> Self {
        self.reply_to_destination_type = kind;
        self
    }

    /// Suppress the broker-assigned message id
    pub fn with_message_id_disabled(mut self, disabled: bool) -> Self {
        self.disable_message_id = disabled;
        self
    }

    /// Suppress the broker-assigned send timestamp
    pub fn with_timestamp_disabled(mut self, disabled: bool) -> Self {
        self.disable_message_timestamp = disabled;
        self
    }
}
