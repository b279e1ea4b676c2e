//! Listeners for trapping inbound connections.
//!
//! One acceptor task per configured port; every accepted connection is
//! closed immediately and reduced to a `ConnectionEvent` on a shared
//! channel.

mod acceptor;

pub use acceptor::{Listener, Listeners};

use std::net::IpAddr;

/// A connection attempt observed by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// Peer IP address, taken structurally from the socket address
    pub peer: IpAddr,

    /// Listening port the attempt arrived on (not the client port)
    pub port: u16,
}
