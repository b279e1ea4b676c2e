//! Service counters.
//!
//! Thin wrappers over the `metrics` facade so call sites stay terse and
//! metric names live in one place. Without an installed recorder these
//! are no-ops.

pub mod counters {
    pub fn connection_accepted(port: u16) {
        metrics::counter!("snared_connections_accepted", "port" => port.to_string())
            .increment(1);
    }

    pub fn accept_error(port: u16) {
        metrics::counter!("snared_accept_errors", "port" => port.to_string()).increment(1);
    }

    pub fn cache_hit() {
        metrics::counter!("snared_dedup_hits").increment(1);
    }

    pub fn cache_evicted() {
        metrics::counter!("snared_dedup_evictions").increment(1);
    }

    pub fn report_submitted() {
        metrics::counter!("snared_reports_submitted").increment(1);
    }

    pub fn report_rate_limited() {
        metrics::counter!("snared_reports_rate_limited").increment(1);
    }

    pub fn report_failed() {
        metrics::counter!("snared_reports_failed").increment(1);
    }

    pub fn notification_sent() {
        metrics::counter!("snared_notifications_sent").increment(1);
    }

    pub fn notification_failed() {
        metrics::counter!("snared_notifications_failed").increment(1);
    }
}
