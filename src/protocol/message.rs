//! Protocol message definitions
//!
//! Defines the three message kinds exchanged between participants.

use std::fmt;

/// Opcode carried in the first byte of every datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    SongSelected = 0,
    ReadyToPreview = 1,
    ReadyToStart = 2,
}

impl Opcode {
    /// Size of the fixed header preceding the identifier
    pub fn header_len(self) -> usize {
        match self {
            Opcode::SongSelected => 1,
            Opcode::ReadyToPreview | Opcode::ReadyToStart => 9,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::SongSelected),
            1 => Ok(Opcode::ReadyToPreview),
            2 => Ok(Opcode::ReadyToStart),
            other => Err(other),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::SongSelected => "SongSelected",
            Opcode::ReadyToPreview => "ReadyToPreview",
            Opcode::ReadyToStart => "ReadyToStart",
        };
        f.write_str(name)
    }
}

/// All possible protocol messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A participant moved its selection to a song or course
    SongSelected { identifier: String },

    /// A participant can begin the preview at `frame` or later
    ReadyToPreview { frame: i64, identifier: String },

    /// A participant can begin gameplay at `frame` or later
    ReadyToStart { frame: i64, identifier: String },
}

impl Message {
    pub fn opcode(&self) -> Opcode {
        match self {
            Message::SongSelected { .. } => Opcode::SongSelected,
            Message::ReadyToPreview { .. } => Opcode::ReadyToPreview,
            Message::ReadyToStart { .. } => Opcode::ReadyToStart,
        }
    }

    /// The song or course this message refers to
    pub fn identifier(&self) -> &str {
        match self {
            Message::SongSelected { identifier }
            | Message::ReadyToPreview { identifier, .. }
            | Message::ReadyToStart { identifier, .. } => identifier,
        }
    }

    /// Proposed frame, for readiness messages
    pub fn frame(&self) -> Option<i64> {
        match self {
            Message::SongSelected { .. } => None,
            Message::ReadyToPreview { frame, .. } | Message::ReadyToStart { frame, .. } => {
                Some(*frame)
            }
        }
    }
}
