//! TCP acceptors for the trap ports.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::bootstrap::Shutdown;
use crate::config::ListenerConfig;
use crate::telemetry::counters;

use super::ConnectionEvent;

/// Pause after an accept error so a persistent failure (EMFILE and
/// friends) cannot spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Capacity of the shared accept channel.
const EVENT_CHANNEL_SIZE: usize = 1024;

/// A single bound trap port.
pub struct Listener {
    socket: TcpListener,
    address: SocketAddr,
}

impl Listener {
    /// Bind a listening socket with address reuse and the configured backlog.
    pub fn bind(bind: IpAddr, port: u16, backlog: u32) -> io::Result<Self> {
        let address = SocketAddr::new(bind, port);
        let socket = match address {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(address)?;
        let socket = socket.listen(backlog)?;

        // Re-read the address so an ephemeral port (0) resolves to the
        // port actually assigned.
        let address = socket.local_addr()?;

        info!(address = %address, "listener bound");
        Ok(Self { socket, address })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Run the accept loop until shutdown.
    ///
    /// Accepted connections are never read from or written to; the
    /// stream is dropped as soon as the peer address is extracted.
    pub async fn run(self, events: mpsc::Sender<ConnectionEvent>, shutdown: Arc<Shutdown>) {
        let port = self.address.port();
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!(port, "listener shutting down");
                    break;
                }

                result = self.socket.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let event = ConnectionEvent {
                                peer: peer_addr.ip(),
                                port,
                            };
                            drop(stream);

                            debug!(ip = %event.peer, port, "connection trapped");
                            counters::connection_accepted(port);

                            if events.send(event).await.is_err() {
                                // Worker gone, nothing left to report to.
                                break;
                            }
                        }
                        Err(e) => {
                            error!(port, error = %e, "accept error");
                            counters::accept_error(port);
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
            }
        }
    }
}

/// The full set of trap listeners.
pub struct Listeners {
    listeners: Vec<Listener>,
}

impl Listeners {
    /// Bind every configured port before any accept task starts.
    ///
    /// A single failed bind aborts the whole set; the service never runs
    /// with fewer listeners than configured.
    pub fn bind(config: &ListenerConfig) -> io::Result<Self> {
        let mut listeners = Vec::with_capacity(config.ports.len());
        for &port in &config.ports {
            listeners.push(Listener::bind(config.bind, port, config.backlog)?);
        }
        Ok(Self { listeners })
    }

    /// Addresses of all bound listeners.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(Listener::local_addr).collect()
    }

    /// Get listener count.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Spawn one accept task per bound port, all feeding the returned
    /// channel.
    pub fn start(self, shutdown: Arc<Shutdown>) -> mpsc::Receiver<ConnectionEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        for listener in self.listeners {
            let events = tx.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                listener.run(events, shutdown).await;
            });
        }

        rx
    }
}
