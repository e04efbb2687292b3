//! Per-send delivery options.
//!
//! Every send call carries its own immutable [`SendOptions`] value instead of
//! configuring state on a shared sender object, so concurrent channels sharing
//! one session can never observe each other's settings.

use std::fmt;
use std::str::FromStr;

/// Priority assigned to a message when none is configured
pub const DEFAULT_PRIORITY: u8 = 4;

/// Persistence guarantee requested for a sent message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    /// Message survives broker restart
    Persistent,
    /// Best-effort delivery, may be lost on broker failure
    NonPersistent,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Persistent => "persistent",
            DeliveryMode::NonPersistent => "non_persistent",
        }
    }
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::Persistent
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    /// Parse a configuration literal, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("persistent") {
            Ok(DeliveryMode::Persistent)
        } else if s.eq_ignore_ascii_case("non_persistent") {
            Ok(DeliveryMode::NonPersistent)
        } else {
            Err(format!(
                "unknown delivery mode '{}', expected \"persistent\" or \"non_persistent\"",
                s
            ))
        }
    }
}

impl serde::Serialize for DeliveryMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for DeliveryMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Immutable options applied atomically with one send invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOptions {
    /// Persistence guarantee for this send
    pub delivery_mode: DeliveryMode,

    /// Priority 0-9, broker default when unset
    pub priority: Option<u8>,

    /// Time-to-live in milliseconds after which the message expires
    pub ttl_ms: Option<i64>,

    /// Milliseconds the broker withholds the message from consumers
    pub delivery_delay_ms: Option<i64>,

    /// Suppress the broker-assigned message identifier
    pub disable_message_id: bool,

    /// Suppress the broker-assigned send timestamp
    pub disable_message_timestamp: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set delivery mode
    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    /// Set message priority (0-9)
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set time-to-live in milliseconds
    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    /// Set delivery delay in milliseconds
    pub fn with_delivery_delay_ms(mut self, delay_ms: i64) -> Self {
        self.delivery_delay_ms = Some(delay_ms);
        self
    }

    /// Suppress or allow the broker-assigned message id
    pub fn with_message_id_disabled(mut self, disabled: bool) -> Self {
        self.disable_message_id = disabled;
        self
    }

    /// Suppress or allow the broker-assigned timestamp
    pub fn with_timestamp_disabled(mut self, disabled: bool) -> Self {
        self.disable_message_timestamp = disabled;
        self
    }

    /// Priority the broker will stamp on the delivered message
    pub fn effective_priority(&self) -> u8 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}
