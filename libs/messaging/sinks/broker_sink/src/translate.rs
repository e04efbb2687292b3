//! Outbound payload to broker message translation.
//!
//! Translation applies settings in two layers: channel configuration first,
//! then per-message metadata, so a message override always wins over the
//! channel default. The translator owns the channel's resolved send options
//! and destination resolver; translating never mutates shared state beyond
//! the resolver's destination cache.

use std::sync::Arc;

use broker::{BrokerMessage, Destination, SendOptions};
use tracing::trace;

use crate::codec::PayloadCodec;
use crate::config::SinkConfig;
use crate::destination::DestinationResolver;
use crate::error::SinkError;
use crate::message::{OutboundMessage, Payload};

/// A broker message paired with where and how to send it
#[derive(Debug, Clone)]
pub struct TranslatedMessage {
    /// Fully populated message ready for the wire
    pub message: BrokerMessage,
    /// Resolved destination for this send
    pub destination: Destination,
    /// Send options in effect for this send
    pub options: SendOptions,
}

/// Turns outbound messages into broker messages
#[derive(Debug)]
pub struct MessageTranslator {
    config: Arc<SinkConfig>,
    resolver: Arc<DestinationResolver>,
    codec: Arc<dyn PayloadCodec>,
    options: SendOptions,
}

impl MessageTranslator {
    /// Create a translator for one channel
    pub fn new(
        config: Arc<SinkConfig>,
        resolver: Arc<DestinationResolver>,
        codec: Arc<dyn PayloadCodec>,
    ) -> Self {
        let options = config.send_options();
        Self {
            config,
            resolver,
            codec,
            options,
        }
    }

    /// Translate one outbound message.
    ///
    /// Errors here fail only this message; the caller nacks it and the
    /// channel keeps flowing.
    pub fn translate(&self, outbound: &OutboundMessage) -> Result<TranslatedMessage, SinkError> {
        let mut message = self.encode(outbound.payload())?;

        if let Some(id) = &self.config.correlation_id {
            message.correlation_id = Some(id.clone());
        }
        if let Some(reply_to) = self.resolver.reply_to()? {
            message.reply_to = Some(reply_to.clone());
        }

        let metadata = outbound.metadata();
        if let Some(id) = &metadata.correlation_id {
            message.correlation_id = Some(id.clone());
        }
        if let Some(name) = &metadata.reply_to {
            let kind = metadata
                .reply_to_kind
                .unwrap_or(self.config.reply_to_destination_type);
            message.reply_to = Some(self.resolver.resolve_override(name, kind)?);
        }
        for (key, value) in &metadata.properties {
            message.properties.insert(key.clone(), value.clone());
        }

        let destination = match &metadata.destination {
            Some(name) => {
                let kind = metadata
                    .destination_kind
                    .unwrap_or(self.config.destination_type);
                self.resolver.resolve_override(name, kind)?
            }
            None => self.resolver.send_target()?.clone(),
        };

        trace!(
            destination = %destination,
            bytes = message.size(),
            "translated outbound message"
        );

        Ok(TranslatedMessage {
            message,
            destination,
            options: self.options,
        })
    }

    fn encode(&self, payload: &Payload) -> Result<BrokerMessage, SinkError> {
        match payload {
            Payload::Text(text) => Ok(BrokerMessage::text(text.clone())),
            Payload::Json(value) => Ok(BrokerMessage::text(self.codec.encode(value)?)),
            Payload::Bytes(bytes) => Ok(BrokerMessage::bytes(bytes.clone())),
        }
    }
}
