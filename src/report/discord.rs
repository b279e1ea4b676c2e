//! Discord webhook notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::NotificationStyle;
use crate::listener::ConnectionEvent;

use super::{Notifier, ReportError};

/// Embed accent color (red).
const EMBED_COLOR: u32 = 15_158_332;

/// Webhook notifier with plain-message and rich-embed formats.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    style: NotificationStyle,
    server_name: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WebhookBody {
    Message { content: String },
    Embeds { embeds: Vec<Embed> },
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    color: u32,
    description: String,
    fields: Vec<EmbedField>,
    footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

impl DiscordNotifier {
    /// Build a notifier with a bounded request timeout.
    pub fn new(
        webhook_url: &str,
        style: NotificationStyle,
        server_name: &str,
        timeout: Duration,
    ) -> Result<Self, ReportError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
            style,
            server_name: server_name.to_string(),
        })
    }

    fn body(&self, event: &ConnectionEvent) -> WebhookBody {
        let description = format!(
            "Unauthorized connection attempt detected from IP address {} to port {}",
            event.peer, event.port
        );

        match self.style {
            NotificationStyle::Message => WebhookBody::Message {
                content: format!("{} ({})", description, self.server_name),
            },
            NotificationStyle::Embed => WebhookBody::Embeds {
                embeds: vec![Embed {
                    title: "Unauthorized connection attempt".to_string(),
                    color: EMBED_COLOR,
                    description,
                    fields: vec![
                        EmbedField {
                            name: "IP Address".to_string(),
                            value: event.peer.to_string(),
                        },
                        EmbedField {
                            name: "Attacked port".to_string(),
                            value: event.port.to_string(),
                        },
                    ],
                    footer: EmbedFooter {
                        text: format!("Server: {}", self.server_name),
                    },
                }],
            },
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, event: &ConnectionEvent) -> Result<(), ReportError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.body(event))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("webhook rate limited");
        } else if !status.is_success() {
            warn!(status = %status, "webhook rejected notification");
        } else {
            debug!(ip = %event.peer, "notification sent");
        }

        Ok(())
    }
}
