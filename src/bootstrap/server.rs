//! Server wiring and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use crate::config::Config;
use crate::dedup::DedupCache;
use crate::listener::Listeners;
use crate::report::{AbuseIpdbClient, AbuseReporter, DiscordNotifier, Notifier};

use super::shutdown::Shutdown;
use super::worker::ReportWorker;

/// The assembled honeypot service.
///
/// Everything the accept loop needs is built here once and handed down
/// explicitly; there is no global state.
pub struct Server {
    config: Config,
    shutdown: Arc<Shutdown>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Bind, serve, and block until SIGINT/SIGTERM.
    ///
    /// All ports are bound before the first accept; any bind failure is
    /// fatal and returned before traffic is served.
    pub async fn run(self) -> Result<()> {
        let listeners = Listeners::bind(&self.config.listener)
            .context("failed to bind trap listeners")?;

        let reporter: Arc<dyn AbuseReporter> = Arc::new(
            AbuseIpdbClient::new(&self.config.abuseipdb, &self.config.server.name)
                .context("failed to build abuse report client")?,
        );

        let notifier: Option<Arc<dyn Notifier>> = match self.config.discord.endpoint() {
            Some(url) => {
                let notifier = DiscordNotifier::new(
                    url,
                    self.config.discord.style,
                    &self.config.server.name,
                    self.config.discord.timeout,
                )
                .context("failed to build webhook notifier")?;
                Some(Arc::new(notifier))
            }
            None => {
                info!("no webhook configured, notifications disabled");
                None
            }
        };

        let cache = DedupCache::new(self.config.dedup.max_entries, self.config.dedup.ttl);
        let worker = ReportWorker::new(cache, reporter, notifier);

        let events = listeners.start(self.shutdown.clone());
        let worker_handle = tokio::spawn(worker.run(events, self.shutdown.subscribe()));

        info!(
            ports = ?self.config.listener.ports,
            server = %self.config.server.name,
            dedup_max = self.config.dedup.max_entries,
            dedup_ttl_secs = self.config.dedup.ttl.as_secs(),
            "snared started"
        );

        wait_for_shutdown().await;

        info!("shutdown signal received, stopping");
        self.shutdown.trigger();

        if let Err(e) = worker_handle.await {
            error!(error = %e, "report worker panicked");
        }

        info!("snared stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("received SIGTERM");
        }
    }
}
