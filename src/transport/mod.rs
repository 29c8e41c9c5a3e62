//! Transport layer.
//!
//! A [`Transport`] is any message-oriented channel that can send one
//! buffer and receive one datagram. [`poll`] drives it with bounded
//! retries and a per-attempt deadline; the engine above assumes one
//! outstanding exchange per transport and does no correlation here.

mod mock;
mod udp;

pub use mock::MockTransport;
pub use udp::UdpTransport;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Receive buffer size for one datagram.
pub const RECV_BUF_SIZE: usize = 16384;

/// Message-oriented transport with no built-in deadline; [`poll`]
/// supplies deadlines and retries.
pub trait Transport: Send {
    /// Send one buffer to the peer.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Receive one datagram into `buf`, returning the byte count.
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// The peer address, when the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// Send a request and wait for one response, with bounded retries.
///
/// Runs up to `retries + 1` attempts. Each attempt puts an independent
/// `timeout` deadline on the send and then on the receive; any
/// single-step failure discards the attempt, is logged, and the next
/// attempt starts. When every attempt has failed the last error comes
/// back as [`Error::Transport`].
pub(crate) async fn poll<T: Transport>(
    transport: &mut T,
    data: &[u8],
    buf: &mut [u8],
    retries: u32,
    timeout: Duration,
) -> Result<usize> {
    let mut last_error: Option<io::Error> = None;

    for attempt in 0..=retries {
        if attempt > 0 {
            tracing::debug!(target: "snmpoll::transport", attempt, retries, "retrying exchange");
        }

        match tokio::time::timeout(timeout, transport.send(data)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(target: "snmpoll::transport", error = %e, attempt, "send failed");
                last_error = Some(e);
                continue;
            }
            Err(_) => {
                tracing::debug!(target: "snmpoll::transport", attempt, "send deadline exceeded");
                last_error = Some(io::Error::new(io::ErrorKind::TimedOut, "send timed out"));
                continue;
            }
        }

        match tokio::time::timeout(timeout, transport.recv(buf)).await {
            Ok(Ok(n)) => return Ok(n),
            Ok(Err(e)) => {
                tracing::debug!(target: "snmpoll::transport", error = %e, attempt, "receive failed");
                last_error = Some(e);
            }
            Err(_) => {
                tracing::debug!(target: "snmpoll::transport", attempt, "receive deadline exceeded");
                last_error = Some(io::Error::new(io::ErrorKind::TimedOut, "receive timed out"));
            }
        }
    }

    Err(Error::Transport {
        attempts: retries + 1,
        timeout,
        source: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no response")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_returns_first_response() {
        let mut transport = MockTransport::new();
        transport.push_response(b"reply".to_vec());

        let mut buf = [0u8; 64];
        let n = poll(&mut transport, b"request", &mut buf, 2, Duration::from_millis(50))
            .await
            .unwrap();

        assert_eq!(&buf[..n], b"reply");
        assert_eq!(transport.sent.len(), 1);
    }

    #[tokio::test]
    async fn test_poll_retries_through_dropped_datagrams() {
        let mut transport = MockTransport::new();
        transport.push_drop();
        transport.push_drop();
        transport.push_response(b"late".to_vec());

        let mut buf = [0u8; 64];
        let n = poll(&mut transport, b"request", &mut buf, 2, Duration::from_millis(20))
            .await
            .unwrap();

        assert_eq!(&buf[..n], b"late");
        assert_eq!(transport.sent.len(), 3);
    }

    #[tokio::test]
    async fn test_poll_exhausts_retries() {
        let mut transport = MockTransport::new();
        for _ in 0..4 {
            transport.push_drop();
        }

        let mut buf = [0u8; 64];
        let err = poll(&mut transport, b"request", &mut buf, 3, Duration::from_millis(10))
            .await
            .unwrap_err();

        match err {
            Error::Transport { attempts, source, .. } => {
                assert_eq!(attempts, 4);
                assert_eq!(source.kind(), io::ErrorKind::TimedOut);
            }
            other => panic!("expected Transport error, got {other:?}"),
        }
        assert_eq!(transport.sent.len(), 4);
    }
}
