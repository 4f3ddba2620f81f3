//! Transport module - Connectionless broadcast delivery of datagrams
//!
//! Provides:
//! - The `Transport` trait the sync session drives each tick
//! - `UdpTransport`, a broadcast UDP socket on the well-known port
//! - `MemoryHub`, an in-process broadcast medium for tests and simulation
//!
//! Delivery is best effort. Nothing here retries, orders or filters by
//! peer address: a participant's own broadcasts come back to it exactly
//! like everybody else's, and the readiness accounting relies on that.

mod memory;
mod udp;

pub use memory::*;
pub use udp::*;

use bytes::Bytes;
use thiserror::Error;

/// Transport setup errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(target_os = "linux")]
    #[error("Socket error: {0}")]
    Socket(#[from] nix::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Broadcast datagram transport polled from the host's frame loop
pub trait Transport {
    /// Whether datagrams are actually sent and received
    fn is_enabled(&self) -> bool;

    /// Whether our own broadcasts are delivered back to us
    fn loops_back(&self) -> bool {
        true
    }

    /// Broadcast a datagram. Failures are logged and dropped.
    fn send(&mut self, payload: &[u8]);

    /// Take the next queued datagram without blocking
    fn try_recv(&mut self) -> Option<Bytes>;

    /// Drain every datagram queued right now, in arrival order
    fn poll_receive(&mut self) -> PollReceive<'_, Self>
    where
        Self: Sized,
    {
        PollReceive { transport: self }
    }
}

/// Lazy iterator over currently queued datagrams
///
/// Ends at the first empty poll; calling `poll_receive` again next tick
/// picks up whatever arrived in between.
pub struct PollReceive<'a, T: Transport> {
    transport: &'a mut T,
}

impl<T: Transport> Iterator for PollReceive<'_, T> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.transport.try_recv()
    }
}
