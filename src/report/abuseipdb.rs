//! AbuseIPDB report client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::AbuseIpdbConfig;
use crate::listener::ConnectionEvent;

use super::{AbuseReporter, ReportError, ReportOutcome};

/// Client for the abuse-report API.
pub struct AbuseIpdbClient {
    client: Client,
    report_url: String,
    key: String,
    categories: String,
    server_name: String,
}

impl AbuseIpdbClient {
    /// Build a client with a bounded request timeout.
    pub fn new(config: &AbuseIpdbConfig, server_name: &str) -> Result<Self, ReportError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            report_url: config.report_url.clone(),
            key: config.key.clone(),
            categories: config.categories.clone(),
            server_name: server_name.to_string(),
        })
    }

    /// Comment text submitted with every report.
    fn comment(&self, event: &ConnectionEvent) -> String {
        format!(
            "Unauthorized connection attempt detected from IP address {} to port {} ({})",
            event.peer, event.port, self.server_name
        )
    }
}

#[async_trait]
impl AbuseReporter for AbuseIpdbClient {
    async fn report(&self, event: &ConnectionEvent) -> Result<ReportOutcome, ReportError> {
        let ip = event.peer.to_string();
        let comment = self.comment(event);

        let response = self
            .client
            .post(&self.report_url)
            .header("Accept", "application/json")
            .header("Key", &self.key)
            .query(&[
                ("ip", ip.as_str()),
                ("categories", self.categories.as_str()),
                ("comment", comment.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(ReportOutcome::RateLimited);
        }

        if status.is_success() {
            debug!(ip = %event.peer, status = %status, "abuse report submitted");
        } else {
            // Still counts as reported for dedup purposes; surface the
            // status so a bad credential is visible in the logs.
            warn!(ip = %event.peer, status = %status, "abuse report rejected");
        }

        Ok(ReportOutcome::Accepted)
    }
}
