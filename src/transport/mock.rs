//! Scripted in-memory transport for tests.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

use super::Transport;

enum Step {
    /// Answer the next receive with these bytes.
    Reply(Vec<u8>),
    /// Never answer; the caller's deadline fires.
    Drop,
}

/// Transport that replays a scripted sequence of responses.
///
/// Each send consumes the next scripted step; `Drop` steps simulate a
/// lost datagram by blocking the receive until the poll deadline fires.
/// Sent frames are recorded for assertions.
#[derive(Default)]
pub struct MockTransport {
    script: VecDeque<Step>,
    pending: Option<Vec<u8>>,
    /// Every frame sent through this transport, in order.
    pub sent: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create an empty mock. With no script, receives block until the
    /// caller's deadline fires.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for the next exchange.
    pub fn push_response(&mut self, data: Vec<u8>) {
        self.script.push_back(Step::Reply(data));
    }

    /// Script a dropped datagram (receive blocks, deadline fires).
    pub fn push_drop(&mut self) {
        self.script.push_back(Step::Drop);
    }

    /// Number of unconsumed scripted steps.
    pub fn remaining(&self) -> usize {
        self.script.len() + self.pending.iter().len()
    }
}

impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.sent.push(data.to_vec());
        self.pending = match self.script.pop_front() {
            Some(Step::Reply(reply)) => Some(reply),
            Some(Step::Drop) | None => None,
        };
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.pending.take() {
            Some(reply) => {
                if reply.len() > buf.len() {
                    // UDP semantics: excess bytes of a datagram are lost
                    buf.copy_from_slice(&reply[..buf.len()]);
                    Ok(buf.len())
                } else {
                    buf[..reply.len()].copy_from_slice(&reply);
                    Ok(reply.len())
                }
            }
            None => std::future::pending().await,
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
