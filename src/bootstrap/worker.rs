//! Report worker: consumes connection events and drives the dedup +
//! report + notify workflow.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::dedup::DedupCache;
use crate::listener::ConnectionEvent;
use crate::report::{AbuseReporter, Notifier, ReportOutcome};
use crate::telemetry::counters;

/// Single consumer of the accept channel.
///
/// Owns the dedup cache outright, so the check-then-mark sequence for a
/// given IP can never interleave with itself. Each event is handled to
/// completion before the next is taken.
pub struct ReportWorker {
    cache: DedupCache,
    reporter: Arc<dyn AbuseReporter>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ReportWorker {
    pub fn new(
        cache: DedupCache,
        reporter: Arc<dyn AbuseReporter>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            cache,
            reporter,
            notifier,
        }
    }

    /// Drain events until shutdown fires or the channel closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ConnectionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    info!("report worker shutting down");
                    break;
                }

                event = events.recv() => {
                    match event {
                        Some(event) => self.handle(event).await,
                        None => break,
                    }
                }
            }
        }
    }

    /// Process one connection attempt to completion.
    pub async fn handle(&mut self, event: ConnectionEvent) {
        if self.cache.contains(event.peer) {
            info!(ip = %event.peer, port = event.port, "already reported within window, skipping");
            counters::cache_hit();
        } else {
            match self.reporter.report(&event).await {
                Ok(ReportOutcome::Accepted) => {
                    self.cache.insert(event.peer);
                    info!(ip = %event.peer, port = event.port, "connection attempt reported");
                    counters::report_submitted();
                }
                Ok(ReportOutcome::RateLimited) => {
                    // The API enforces its own cooldown; treat as reported
                    // so we stop hammering it.
                    self.cache.insert(event.peer);
                    info!(ip = %event.peer, "already reported upstream, waiting out the cooldown");
                    counters::report_rate_limited();
                }
                Err(e) => {
                    warn!(ip = %event.peer, error = %e, "abuse report failed, will retry on next attempt");
                    counters::report_failed();
                }
            }
        }

        // Notifications fire on every attempt, hit or miss.
        if let Some(notifier) = &self.notifier {
            match notifier.notify(&event).await {
                Ok(()) => counters::notification_sent(),
                Err(e) => {
                    warn!(ip = %event.peer, error = %e, "notification failed");
                    counters::notification_failed();
                }
            }
        }
    }
}
