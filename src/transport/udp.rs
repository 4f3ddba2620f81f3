//! UDP broadcast transport
//!
//! One socket per participant, bound to the well-known port on all local
//! addresses with address/port reuse so several instances can share a host.

use bytes::Bytes;
use std::io::ErrorKind;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};

use super::{Transport, TransportResult};
use crate::config::NetworkConfig;
use crate::protocol::MAX_PAYLOAD;

/// Broadcast UDP socket, or a disabled stand-in when setup failed
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    target: SocketAddrV4,
    recv_buf: Vec<u8>,
}

impl UdpTransport {
    /// Open the broadcast socket, degrading to a disabled transport on failure
    pub fn open(config: &NetworkConfig) -> Self {
        match Self::try_open(config) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!("Sync transport disabled, playing unsynchronized: {}", e);
                Self::disabled()
            }
        }
    }

    /// Open the broadcast socket, reporting the failing step
    pub fn try_open(config: &NetworkConfig) -> TransportResult<Self> {
        let bind_addr = SocketAddrV4::new(config.bind_address, config.port);
        let socket = bind_broadcast_socket(bind_addr)?;
        socket.set_nonblocking(true)?;

        // Port 0 binds an ephemeral port; broadcast back onto whatever we got
        let port = socket.local_addr()?.port();
        let target = SocketAddrV4::new(config.broadcast_address, port);

        tracing::info!("Sync transport bound to {}, broadcasting to {}", socket.local_addr()?, target);

        Ok(Self {
            socket: Some(socket),
            target,
            recv_buf: vec![0; MAX_PAYLOAD],
        })
    }

    /// A transport that sends nothing and never receives
    pub fn disabled() -> Self {
        Self {
            socket: None,
            target: SocketAddrV4::new(crate::protocol::DEFAULT_BROADCAST_ADDR, crate::protocol::DEFAULT_PORT),
            recv_buf: Vec::new(),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn broadcast_target(&self) -> SocketAddrV4 {
        self.target
    }
}

impl Transport for UdpTransport {
    fn is_enabled(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, payload: &[u8]) {
        let Some(socket) = &self.socket else {
            return;
        };

        if let Err(e) = socket.send_to(payload, self.target) {
            tracing::warn!("sendto {} failed: {}", self.target, e);
        }
    }

    fn try_recv(&mut self) -> Option<Bytes> {
        let socket = self.socket.as_ref()?;

        loop {
            match socket.recv_from(&mut self.recv_buf) {
                Ok((len, _from)) => return Some(Bytes::copy_from_slice(&self.recv_buf[..len])),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return None,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("recvfrom failed: {}", e);
                    return None;
                }
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn bind_broadcast_socket(addr: SocketAddrV4) -> TransportResult<UdpSocket> {
    use nix::sys::socket::{
        bind, setsockopt, socket, sockopt, AddressFamily, SockFlag, SockType, SockaddrIn,
    };
    use std::os::fd::AsRawFd;

    let fd = socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::SOCK_CLOEXEC,
        None,
    )?;

    setsockopt(&fd, sockopt::Broadcast, &true)?;
    setsockopt(&fd, sockopt::ReuseAddr, &true)?;
    setsockopt(&fd, sockopt::ReusePort, &true)?;
    bind(fd.as_raw_fd(), &SockaddrIn::from(addr))?;

    Ok(UdpSocket::from(fd))
}

#[cfg(not(target_os = "linux"))]
fn bind_broadcast_socket(addr: SocketAddrV4) -> TransportResult<UdpSocket> {
    // No portable SO_REUSEPORT through std; one instance per host here
    let socket = UdpSocket::bind(addr)?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn loopback_config() -> NetworkConfig {
        NetworkConfig {
            port: 0,
            bind_address: Ipv4Addr::LOCALHOST,
            broadcast_address: Ipv4Addr::LOCALHOST,
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_transport_is_inert() {
        let mut transport = UdpTransport::disabled();
        assert!(!transport.is_enabled());
        assert!(transport.local_addr().is_none());

        transport.send(b"\x00Group/Song");
        assert_eq!(transport.poll_receive().count(), 0);
    }

    #[test]
    fn test_empty_poll_does_not_block() {
        let mut transport = UdpTransport::try_open(&loopback_config()).unwrap();
        assert!(transport.is_enabled());
        assert_eq!(transport.poll_receive().count(), 0);
    }

    #[test]
    fn test_own_datagrams_loop_back() {
        let mut transport = UdpTransport::try_open(&loopback_config()).unwrap();
        transport.send(b"\x00first");
        transport.send(b"\x00second");

        let mut received = Vec::new();
        for _ in 0..100 {
            received.extend(transport.poll_receive());
            if received.len() == 2 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(received, vec![Bytes::from_static(b"\x00first"), Bytes::from_static(b"\x00second")]);
    }

    /// Two instances sharing the well-known port on one host, talking over
    /// the host-local broadcast address
    #[cfg(target_os = "linux")]
    fn shared_port_config(port: u16) -> NetworkConfig {
        NetworkConfig {
            port,
            ..Default::default()
        }
    }

    #[cfg(target_os = "linux")]
    fn drain_until(transport: &mut UdpTransport, want: usize) -> Vec<Bytes> {
        let mut received = Vec::new();
        for _ in 0..100 {
            received.extend(transport.poll_receive());
            if received.len() >= want {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        received
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_two_instances_share_port_and_hear_broadcast() {
        let config = shared_port_config(53911);
        let mut a = UdpTransport::try_open(&config).unwrap();
        let mut b = UdpTransport::try_open(&config).unwrap();
        assert_eq!(a.broadcast_target(), SocketAddrV4::new(crate::protocol::DEFAULT_BROADCAST_ADDR, 53911));

        a.send(b"\x00Pack/Song");

        let expected = vec![Bytes::from_static(b"\x00Pack/Song")];
        assert_eq!(drain_until(&mut a, 1), expected);
        assert_eq!(drain_until(&mut b, 1), expected);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_start_quorum_over_host_broadcast() {
        use crate::sync::{ParticipantCount, SyncStartManager};

        let config = shared_port_config(53912);
        let mut a = SyncStartManager::new(UdpTransport::try_open(&config).unwrap(), ParticipantCount::PAIR);
        let mut b = SyncStartManager::new(UdpTransport::try_open(&config).unwrap(), ParticipantCount::PAIR);
        assert!(a.is_enabled() && b.is_enabled());

        a.announce_ready_to_start("Pack/Song", 100);
        b.announce_ready_to_start("Pack/Song", 130);

        let (mut start_a, mut start_b) = (None, None);
        for _ in 0..100 {
            a.tick();
            b.tick();
            start_a = start_a.or(a.try_consume_start());
            start_b = start_b.or(b.try_consume_start());
            if start_a.is_some() && start_b.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(start_a, Some(130));
        assert_eq!(start_b, Some(130));
        assert!(!a.should_stall());
        assert!(!b.should_stall());
    }
}
