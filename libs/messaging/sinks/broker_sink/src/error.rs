use broker::BrokerError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Payload encoding failed: {0}")]
    Codec(String),

    #[error("Invalid destination override: {0}")]
    Resolution(String),

    #[error("Transport failure: {0}")]
    Transport(#[source] BrokerError),

    #[error("Sink closed")]
    Closed,
}

impl SinkError {
    /// Check if this error was fatal at construction time
    pub fn is_configuration(&self) -> bool {
        matches!(self, SinkError::Configuration(_))
    }

    /// Check if this error fails one message and leaves the stream running
    pub fn is_translation_class(&self) -> bool {
        matches!(
            self,
            SinkError::Translation(_) | SinkError::Codec(_) | SinkError::Resolution(_)
        )
    }

    /// Check if this error came from the broker transport
    pub fn is_transport(&self) -> bool {
        matches!(self, SinkError::Transport(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SinkError::Closed)
    }

    /// Check if retrying the message could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SinkError::Transport(err) if err.is_recoverable())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        SinkError::Configuration(msg.into())
    }

    /// Create a translation error
    pub fn translation(msg: impl Into<String>) -> Self {
        SinkError::Translation(msg.into())
    }

    /// Create a codec error
    pub fn codec(msg: impl Into<String>) -> Self {
        SinkError::Codec(msg.into())
    }

    /// Create a per-message resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        SinkError::Resolution(msg.into())
    }
}

impl From<BrokerError> for SinkError {
    fn from(err: BrokerError) -> Self {
        SinkError::Transport(err)
    }
}
