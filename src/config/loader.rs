use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::Config;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.listener.ports.is_empty() {
            anyhow::bail!("at least one trap port must be configured");
        }

        let mut seen_ports = std::collections::HashSet::new();
        for &port in &self.listener.ports {
            if port == 0 {
                anyhow::bail!("trap port 0 is not a valid listening port");
            }
            if !seen_ports.insert(port) {
                anyhow::bail!("duplicate trap port: {}", port);
            }
        }

        if self.abuseipdb.key.trim().is_empty() {
            anyhow::bail!("abuseipdb.key must not be empty");
        }

        if self.abuseipdb.report_url.trim().is_empty() {
            anyhow::bail!("abuseipdb.report_url must not be empty");
        }

        if self.abuseipdb.categories.trim().is_empty() {
            anyhow::bail!("abuseipdb.categories must not be empty");
        }

        if self.server.name.trim().is_empty() {
            anyhow::bail!("server.name must not be empty");
        }

        if self.dedup.max_entries == 0 {
            anyhow::bail!("dedup.max_entries must be at least 1");
        }

        if self.dedup.ttl.is_zero() {
            anyhow::bail!("dedup.ttl must be greater than zero");
        }

        info!("configuration validated successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationStyle;
    use std::io::Write;
    use std::time::Duration;

    fn minimal_yaml() -> &'static str {
        r#"
listener:
  ports: [22]

abuseipdb:
  key: "0123456789abcdef"
  report_url: "https://api.abuseipdb.com/api/v2/report"
  categories: "14,18,22"

server:
  name: "vps-test"
"#
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::from_yaml(minimal_yaml()).unwrap();
        assert_eq!(config.listener.ports, vec![22]);
        assert_eq!(config.server.name, "vps-test");
        assert!(config.discord.endpoint().is_none());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml(minimal_yaml()).unwrap();
        assert_eq!(config.dedup.max_entries, 50);
        assert_eq!(config.dedup.ttl, Duration::from_secs(900));
        assert_eq!(config.abuseipdb.timeout, Duration::from_secs(10));
        assert_eq!(config.discord.style, NotificationStyle::Message);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.telemetry.json_logs);
        assert_eq!(config.listener.bind.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
listener:
  bind: "127.0.0.1"
  ports: [22, 2222]
  backlog: 64

abuseipdb:
  key: "0123456789abcdef"
  report_url: "https://api.abuseipdb.com/api/v2/report"
  categories: "14,18,22"
  timeout: 5s

discord:
  webhook_url: "https://discord.com/api/webhooks/1/abc"
  style: embed
  timeout: 3s

server:
  name: "edge-1"

dedup:
  max_entries: 100
  ttl: 30m

telemetry:
  log_level: debug
  json_logs: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listener.ports, vec![22, 2222]);
        assert_eq!(config.listener.backlog, 64);
        assert_eq!(config.discord.style, NotificationStyle::Embed);
        assert_eq!(config.discord.endpoint(), Some("https://discord.com/api/webhooks/1/abc"));
        assert_eq!(config.dedup.max_entries, 100);
        assert_eq!(config.dedup.ttl, Duration::from_secs(1800));
        assert!(config.telemetry.json_logs);
    }

    #[test]
    fn test_no_ports() {
        let yaml = minimal_yaml().replace("ports: [22]", "ports: []");
        let result = Config::from_yaml(&yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least one trap port"));
    }

    #[test]
    fn test_duplicate_ports() {
        let yaml = minimal_yaml().replace("ports: [22]", "ports: [22, 22]");
        let result = Config::from_yaml(&yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate trap port"));
    }

    #[test]
    fn test_port_zero_rejected() {
        let yaml = minimal_yaml().replace("ports: [22]", "ports: [0]");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_empty_api_key_fatal() {
        let yaml = minimal_yaml().replace(r#"key: "0123456789abcdef""#, r#"key: """#);
        let result = Config::from_yaml(&yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("abuseipdb.key"));
    }

    #[test]
    fn test_empty_server_name_fatal() {
        let yaml = minimal_yaml().replace(r#"name: "vps-test""#, r#"name: "  ""#);
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_empty_webhook_treated_as_unconfigured() {
        let yaml = format!(
            "{}\ndiscord:\n  webhook_url: \"\"\n",
            minimal_yaml()
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert!(config.discord.endpoint().is_none());
    }

    #[test]
    fn test_missing_required_section() {
        let yaml = r#"
listener:
  ports: [22]

server:
  name: "vps-test"
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(minimal_yaml().as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.listener.ports, vec![22]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/snared.yaml");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("failed to read config file"));
    }
}
