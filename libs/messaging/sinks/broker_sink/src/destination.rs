//! Destination resolution and caching.
//!
//! The channel's configured send target and reply-to destination are resolved
//! against the broker session exactly once and reused for every message.
//! Per-message override destinations are resolved on first use and cached by
//! name and kind, so a stream that alternates between a handful of targets
//! pays the broker round-trip only once per target.

use std::sync::Arc;

use broker::{BrokerSession, Destination, DestinationKind};
use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::config::SinkConfig;
use crate::error::SinkError;

/// Resolves destination names to broker handles
#[derive(Debug)]
pub struct DestinationResolver {
    session: Arc<dyn BrokerSession>,
    config: Arc<SinkConfig>,
    send_target: OnceCell<Destination>,
    reply_to: OnceCell<Option<Destination>>,
    overrides: DashMap<(String, DestinationKind), Destination>,
}

impl DestinationResolver {
    /// Create a resolver for one channel's session and configuration
    pub fn new(session: Arc<dyn BrokerSession>, config: Arc<SinkConfig>) -> Self {
        Self {
            session,
            config,
            send_target: OnceCell::new(),
            reply_to: OnceCell::new(),
            overrides: DashMap::new(),
        }
    }

    /// The configured destination messages are written to.
    ///
    /// Resolved on first call; a failure here is a transport error because the
    /// channel cannot function without its send target.
    pub fn send_target(&self) -> Result<&Destination, SinkError> {
        self.send_target.get_or_try_init(|| {
            let destination = self
                .session
                .create_destination(&self.config.destination, self.config.destination_type)?;
            Ok::<_, SinkError>(destination)
        })
    }

    /// The configured reply-to destination, if any
    pub fn reply_to(&self) -> Result<Option<&Destination>, SinkError> {
        let resolved = self.reply_to.get_or_try_init(|| match &self.config.reply_to {
            Some(name) => {
                let destination = self
                    .session
                    .create_destination(name, self.config.reply_to_destination_type)?;
                Ok::<_, SinkError>(Some(destination))
            }
            None => Ok(None),
        })?;
        Ok(resolved.as_ref())
    }

    /// Resolve a per-message override destination.
    ///
    /// Failures are resolution errors: they fail that one message without
    /// tearing down the channel.
    pub fn resolve_override(
        &self,
        name: &str,
        kind: DestinationKind,
    ) -> Result<Destination, SinkError> {
        if name.trim().is_empty() {
            return Err(SinkError::resolution("destination override is empty"));
        }
        let key = (name.to_string(), kind);
        if let Some(cached) = self.overrides.get(&key) {
            return Ok(cached.clone());
        }
        let destination = self
            .session
            .create_destination(name, kind)
            .map_err(|err| SinkError::resolution(format!("{}:{}: {}", kind, name, err)))?;
        self.overrides.insert(key, destination.clone());
        Ok(destination)
    }

    /// Number of override destinations resolved so far
    pub fn cached_overrides(&self) -> usize {
        self.overrides.len()
    }
}
