//! Exactly-once completion signaling.
//!
//! A [`Completion`] is the awaitable outcome of one asynchronous operation.
//! Its resolving half consumes itself on resolution, so a completion can be
//! resolved at most once on exactly one path; a sender dropped without
//! resolving surfaces as [`SinkError::Closed`] rather than hanging the
//! awaiter.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::SinkError;

/// Resolving half of a completion pair
#[derive(Debug)]
pub(crate) struct CompletionSender {
    tx: oneshot::Sender<Result<(), SinkError>>,
}

impl CompletionSender {
    /// Resolve with `result`. The awaiter may already be gone; resolution
    /// is fire-and-forget.
    pub(crate) fn resolve(self, result: Result<(), SinkError>) {
        let _ = self.tx.send(result);
    }
}

/// Awaitable outcome of one asynchronous operation
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Result<(), SinkError>>,
}

impl Completion {
    /// Create a connected sender/completion pair
    pub(crate) fn channel() -> (CompletionSender, Completion) {
        let (tx, rx) = oneshot::channel();
        (CompletionSender { tx }, Completion { rx })
    }

    /// Create a completion already resolved with `result`
    pub(crate) fn resolved(result: Result<(), SinkError>) -> Completion {
        let (sender, completion) = Completion::channel();
        sender.resolve(result);
        completion
    }
}

impl Future for Completion {
    type Output = Result<(), SinkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(SinkError::Closed),
        })
    }
}
