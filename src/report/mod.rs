//! Outbound reporting: abuse-report API client and webhook notifier.
//!
//! Both collaborators sit behind object-safe traits so the accept loop
//! can be exercised with fakes.

mod abuseipdb;
mod discord;

pub use abuseipdb::AbuseIpdbClient;
pub use discord::DiscordNotifier;

use async_trait::async_trait;
use thiserror::Error;

use crate::listener::ConnectionEvent;

/// Result of an abuse-report submission that reached the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The API answered; the attempt is on record
    Accepted,
    /// The API answered 429: already reported recently, its own
    /// cooldown applies
    RateLimited,
}

/// Errors from outbound report and notification calls.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Transport-level failure (DNS, connection reset, timeout)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Submits abuse reports for connection attempts.
#[async_trait]
pub trait AbuseReporter: Send + Sync {
    async fn report(&self, event: &ConnectionEvent) -> Result<ReportOutcome, ReportError>;
}

/// Sends human-readable notifications for connection attempts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &ConnectionEvent) -> Result<(), ReportError>;
}
