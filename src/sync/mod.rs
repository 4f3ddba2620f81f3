//! Sync module - Agreement on the selected song and a common start frame
//!
//! Provides:
//! - `SelectionState`, deduplicating local selection announcements and
//!   holding the latest remote one until the host reads it
//! - `ReadinessRound`, the quorum state machine run once for preview and
//!   once for start
//! - `SyncStartManager`, the facade the host drives every frame
//!
//! # Transport precondition
//!
//! A participant's own readiness broadcast counts as its vote. With a
//! transport that loops broadcasts back to the sender, that vote arrives
//! through `tick()` like any other. Otherwise the manager applies it at
//! send time.
//!
//! # Known weakness
//!
//! Votes carry no participant identity. A duplicated datagram is counted
//! exactly like a vote from another participant and can decide a round
//! early. Once a round is decided, every further vote for the same target
//! re-arms the decision.

mod manager;
mod readiness;
mod selection;

pub use manager::*;
pub use readiness::*;
pub use selection::*;

use std::fmt;
use std::num::NonZeroU32;

/// Number of participants in a session, fixed for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantCount(NonZeroU32);

impl ParticipantCount {
    /// The reference deployment: two cabinets side by side
    pub const PAIR: ParticipantCount = match NonZeroU32::new(2) {
        Some(n) => ParticipantCount(n),
        None => unreachable!(),
    };

    /// `None` for zero
    pub fn new(count: u32) -> Option<Self> {
        NonZeroU32::new(count).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Votes still missing once the first vote for a target has arrived
    pub fn votes_after_first(self) -> u32 {
        self.0.get() - 1
    }
}

impl Default for ParticipantCount {
    fn default() -> Self {
        Self::PAIR
    }
}

impl fmt::Display for ParticipantCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which readiness round a vote belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundKind {
    Preview,
    Start,
}

impl fmt::Display for RoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundKind::Preview => f.write_str("preview"),
            RoundKind::Start => f.write_str("start"),
        }
    }
}
