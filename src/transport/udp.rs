//! Connected-UDP transport.

use std::io;
use std::net::SocketAddr;

use tokio::net::{UdpSocket, lookup_host};

use super::Transport;
use crate::error::{Error, Result};

/// Default agent port for requests.
pub const DEFAULT_PORT: u16 = 161;

/// A UDP socket connected to one agent.
///
/// Connecting filters inbound datagrams to the peer address at the
/// kernel level, which is the only correlation the one-in-flight
/// exchange model needs.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Resolve `target` and connect to it.
    ///
    /// A bare host gets the default port 161 appended; `host:port` and
    /// full socket addresses are used as given.
    pub async fn connect(target: &str) -> Result<Self> {
        let target = if target.parse::<SocketAddr>().is_ok() || target.contains(':') {
            target.to_string()
        } else {
            format!("{target}:{DEFAULT_PORT}")
        };

        let peer = lookup_host(&target)
            .await
            .map_err(|source| Error::Io { source })?
            .next()
            .ok_or_else(|| Error::Io {
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no addresses for {target}"),
                ),
            })?;

        let bind_addr: SocketAddr = if peer.is_ipv6() {
            "[::]:0".parse().expect("literal bind address")
        } else {
            "0.0.0.0:0".parse().expect("literal bind address")
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| Error::Io { source })?;
        socket
            .connect(peer)
            .await
            .map_err(|source| Error::Io { source })?;

        tracing::debug!(target: "snmpoll::transport", peer = %peer, "connected");

        Ok(Self { socket, peer })
    }

    /// Wrap an already-connected socket.
    pub fn from_socket(socket: UdpSocket, peer: SocketAddr) -> Self {
        Self { socket, peer }
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.socket.send(data).await.map(|_| ())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}
