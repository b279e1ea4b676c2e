use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Root configuration for snared
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Trap ports to listen on
    pub listener: ListenerConfig,

    /// Abuse-report API settings
    pub abuseipdb: AbuseIpdbConfig,

    /// Webhook notifications
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Deployment identity
    pub server: ServerConfig,

    /// Report deduplication bounds
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Logging settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    /// Address to bind on
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// TCP ports to trap
    pub ports: Vec<u16>,

    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: u32,
}

fn default_bind() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_backlog() -> u32 {
    128
}

/// Abuse-report API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AbuseIpdbConfig {
    /// API credential, sent as the `Key` header
    pub key: String,

    /// Report submission endpoint
    pub report_url: String,

    /// Category codes submitted with every report
    pub categories: String,

    /// Outbound request timeout
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

/// Webhook notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Webhook endpoint; notifications are skipped when unset or empty
    pub webhook_url: Option<String>,

    /// Notification formatting
    #[serde(default)]
    pub style: NotificationStyle,

    /// Outbound request timeout
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl DiscordConfig {
    /// The webhook endpoint, treating an empty string as unconfigured.
    pub fn endpoint(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|url| !url.is_empty())
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            style: NotificationStyle::default(),
            timeout: default_http_timeout(),
        }
    }
}

/// Notification formatting
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStyle {
    /// Plain text `content` message
    #[default]
    Message,
    /// Rich embed with IP and port fields
    Embed,
}

/// Deployment identity
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Human-readable label included in reports and notifications
    pub name: String,
}

/// Report deduplication bounds
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Maximum tracked IPs
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// How long a reported IP stays suppressed
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl: default_ttl(),
        }
    }
}

fn default_max_entries() -> usize {
    50
}

fn default_ttl() -> Duration {
    Duration::from_secs(900)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Structured JSON log output
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Humantime serde support module
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
