use crate::destination::DestinationKind;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    #[error("Destination '{name}' already exists as a {existing}")]
    DestinationConflict {
        name: String,
        existing: DestinationKind,
    },

    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    #[error("Send rejected: {0}")]
    SendRejected(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(String),
}

impl BrokerError {
    /// Check if retrying the operation could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BrokerError::SendRejected(_) | BrokerError::Io(_))
    }

    /// Create a destination conflict error
    pub fn destination_conflict(name: impl Into<String>, existing: DestinationKind) -> Self {
        BrokerError::DestinationConflict {
            name: name.into(),
            existing,
        }
    }

    /// Create a destination not found error
    pub fn destination_not_found(name: impl Into<String>) -> Self {
        BrokerError::DestinationNotFound(name.into())
    }

    /// Create a send rejected error
    pub fn send_rejected(msg: impl Into<String>) -> Self {
        BrokerError::SendRejected(msg.into())
    }
}

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        BrokerError::Io(err.to_string())
    }
}
