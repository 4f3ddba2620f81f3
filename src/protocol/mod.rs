//! Protocol module - Defines the sync-start wire format
//!
//! Every datagram starts with a single opcode byte:
//! - `SongSelected`: opcode + UTF-8 identifier (rest of datagram)
//! - `ReadyToPreview` / `ReadyToStart`: opcode + 8 bytes big-endian
//!   signed frame + UTF-8 identifier (rest of datagram)
//!
//! There is no length prefix, sequence number or checksum. The transport
//! is unreliable and unordered and the protocol above it tolerates that.

mod codec;
mod message;

pub use codec::*;
pub use message::*;

use std::net::Ipv4Addr;

/// Well-known port every participant binds to and broadcasts on
pub const DEFAULT_PORT: u16 = 53000;

/// Default broadcast target (host-local broadcast)
pub const DEFAULT_BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::new(127, 255, 255, 255);

/// Maximum datagram size, header included
pub const MAX_PAYLOAD: usize = 1024;
