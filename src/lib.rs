//! SyncStart - Peer-to-peer sync-start coordination
//!
//! Lets a fixed number of game instances on a LAN agree on the selected
//! song or course and on a common frame at which they all begin the
//! preview or gameplay, with no central coordinator and an unreliable
//! broadcast transport.

pub mod config;
pub mod identifier;
pub mod protocol;
pub mod sync;
pub mod transport;

pub use config::Config;
pub use identifier::{Course, Song};
pub use sync::{ParticipantCount, SyncStartManager};
