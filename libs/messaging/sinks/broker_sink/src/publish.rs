//! Async publisher over a blocking broker session.
//!
//! Broker sends are blocking calls, so they must never run on the async
//! runtime's worker threads. The publisher bridges the two worlds:
//!
//! ## Architecture
//!
//! - Each [`Publisher::publish`] submission spawns a task that first acquires
//!   one of a fixed number of permits, then runs the session send on the
//!   blocking thread pool.
//! - Submissions beyond the permit count queue on the semaphore in FIFO
//!   order. No submission is dropped.
//! - The returned [`Completion`] resolves with the send outcome, after the
//!   broker has accepted or rejected the message.
//!
//! ## Shutdown
//!
//! [`Publisher::close`] rejects new submissions immediately; everything
//! already submitted still runs to completion. [`Publisher::drain`] waits
//! until no submission is queued or executing, which is the point where the
//! session can be released safely.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use broker::BrokerSession;
use tokio::sync::{Notify, Semaphore};
use tracing::warn;

use crate::completion::Completion;
use crate::error::SinkError;
use crate::stats::{SinkStats, StatsSnapshot};
use crate::translate::TranslatedMessage;

/// Default number of concurrent blocking sends
pub const DEFAULT_WORKERS: usize = 3;

/// Publisher tuning knobs
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Maximum concurrent blocking sends
    pub workers: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

impl PublisherConfig {
    /// Config with a specific worker count (minimum 1)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Config that serializes all sends through one worker
    pub fn single_worker() -> Self {
        Self::new(1)
    }
}

/// Tracks submissions from publish until their completion resolves
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    drained: Notify,
}

impl InFlight {
    fn enter(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_empty(&self) {
        loop {
            let drained = self.drained.notified();
            if self.count() == 0 {
                return;
            }
            drained.await;
        }
    }
}

/// Publishes translated messages through a bounded worker pool
#[derive(Debug)]
pub struct Publisher {
    session: Arc<dyn BrokerSession>,
    permits: Arc<Semaphore>,
    stats: Arc<SinkStats>,
    in_flight: Arc<InFlight>,
    closed: AtomicBool,
}

impl Publisher {
    /// Create a publisher over a broker session
    pub fn new(session: Arc<dyn BrokerSession>, config: PublisherConfig) -> Self {
        Self {
            session,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            stats: Arc::new(SinkStats::new()),
            in_flight: Arc::new(InFlight::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Submit one message for sending.
    ///
    /// Never blocks the caller. The returned completion resolves once the
    /// broker has accepted or rejected the message, or immediately with
    /// [`SinkError::Closed`] when the publisher no longer accepts work.
    pub fn publish(&self, translated: TranslatedMessage) -> Completion {
        if self.closed.load(Ordering::SeqCst) {
            return Completion::resolved(Err(SinkError::Closed));
        }

        let (sender, completion) = Completion::channel();
        let session = self.session.clone();
        let permits = self.permits.clone();
        let stats = self.stats.clone();
        let in_flight = self.in_flight.clone();

        // Counted at submission so drain started right after publish
        // returns still sees this message.
        in_flight.enter();

        tokio::spawn(async move {
            let result = Self::execute(session, permits, &stats, translated).await;
            sender.resolve(result);
            in_flight.exit();
        });

        completion
    }

    async fn execute(
        session: Arc<dyn BrokerSession>,
        permits: Arc<Semaphore>,
        stats: &SinkStats,
        translated: TranslatedMessage,
    ) -> Result<(), SinkError> {
        let _permit = permits.acquire_owned().await.map_err(|_| SinkError::Closed)?;

        let TranslatedMessage {
            message,
            destination,
            options,
        } = translated;
        let bytes = message.size();

        stats.begin_send();
        let outcome =
            tokio::task::spawn_blocking(move || session.send(&destination, message, &options))
                .await;
        stats.end_send();

        match outcome {
            Ok(Ok(())) => {
                stats.record_published(bytes);
                Ok(())
            }
            Ok(Err(err)) => {
                stats.record_failed();
                warn!(error = %err, "broker rejected message");
                Err(SinkError::Transport(err))
            }
            Err(err) => {
                stats.record_failed();
                warn!(error = %err, "send worker aborted");
                Err(SinkError::Closed)
            }
        }
    }

    /// Stop accepting new submissions
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Check if the publisher accepts new submissions
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until every submitted message has resolved
    pub async fn drain(&self) {
        self.in_flight.wait_empty().await;
    }

    /// Number of submissions not yet resolved
    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    /// Current publish counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn stats_handle(&self) -> Arc<SinkStats> {
        self.stats.clone()
    }
}
