//! Destination handles for the two delivery models a broker exposes.

use std::fmt;
use std::str::FromStr;

/// Delivery model of a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    /// Point-to-point: each message goes to exactly one consumer
    Queue,
    /// Publish/subscribe: each message goes to every active subscriber
    Topic,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::Queue => "queue",
            DestinationKind::Topic => "topic",
        }
    }
}

impl Default for DestinationKind {
    fn default() -> Self {
        DestinationKind::Queue
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationKind {
    type Err = String;

    /// Parse a configuration literal, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("queue") {
            Ok(DestinationKind::Queue)
        } else if s.eq_ignore_ascii_case("topic") {
            Ok(DestinationKind::Topic)
        } else {
            Err(format!(
                "unknown destination type '{}', expected \"queue\" or \"topic\"",
                s
            ))
        }
    }
}

impl serde::Serialize for DestinationKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for DestinationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolved broker destination handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub name: String,
    pub kind: DestinationKind,
}

impl Destination {
    pub fn new(name: impl Into<String>, kind: DestinationKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a queue destination handle
    pub fn queue(name: impl Into<String>) -> Self {
        Self::new(name, DestinationKind::Queue)
    }

    /// Create a topic destination handle
    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(name, DestinationKind::Topic)
    }

    pub fn is_queue(&self) -> bool {
        self.kind == DestinationKind::Queue
    }

    pub fn is_topic(&self) -> bool {
        self.kind == DestinationKind::Topic
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}
