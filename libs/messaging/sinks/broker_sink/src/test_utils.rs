//! Test doubles for exercising the sink without a broker.

use std::sync::atomic::{AtomicBool, Ordering};

use broker::{BrokerError, BrokerMessage, BrokerSession, Destination, SendOptions};
use parking_lot::Mutex;

use crate::codec::PayloadCodec;
use crate::error::SinkError;

/// One send observed by a [`RecordingSession`]
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub destination: Destination,
    pub message: BrokerMessage,
    pub options: SendOptions,
}

/// Session that records every send instead of delivering it
#[derive(Debug, Default)]
pub struct RecordingSession {
    sends: Mutex<Vec<RecordedSend>>,
    fail_next: AtomicBool,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next send with a transport error
    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Copy of everything sent so far
    pub fn recorded(&self) -> Vec<RecordedSend> {
        self.sends.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sends.lock().len()
    }
}

impl BrokerSession for RecordingSession {
    fn create_queue(&self, name: &str) -> Result<Destination, BrokerError> {
        Ok(Destination::queue(name))
    }

    fn create_topic(&self, name: &str) -> Result<Destination, BrokerError> {
        Ok(Destination::topic(name))
    }

    fn send(
        &self,
        destination: &Destination,
        message: BrokerMessage,
        options: &SendOptions,
    ) -> Result<(), BrokerError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BrokerError::send_rejected("injected transport failure"));
        }
        self.sends.lock().push(RecordedSend {
            destination: destination.clone(),
            message,
            options: *options,
        });
        Ok(())
    }
}

/// Session whose sends always fail
#[derive(Debug)]
pub struct FailingSession {
    reason: String,
}

impl FailingSession {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for FailingSession {
    fn default() -> Self {
        Self::new("injected transport failure")
    }
}

impl BrokerSession for FailingSession {
    fn create_queue(&self, name: &str) -> Result<Destination, BrokerError> {
        Ok(Destination::queue(name))
    }

    fn create_topic(&self, name: &str) -> Result<Destination, BrokerError> {
        Ok(Destination::topic(name))
    }

    fn send(
        &self,
        _destination: &Destination,
        _message: BrokerMessage,
        _options: &SendOptions,
    ) -> Result<(), BrokerError> {
        Err(BrokerError::send_rejected(self.reason.clone()))
    }
}

/// Codec whose encode always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCodec;

impl PayloadCodec for FailingCodec {
    fn encode(&self, _value: &serde_json::Value) -> Result<String, SinkError> {
        Err(SinkError::codec("injected codec failure"))
    }
}
