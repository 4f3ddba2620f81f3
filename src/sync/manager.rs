//! Sync-start session facade
//!
//! The host calls the announce methods when its UI state changes, calls
//! `tick()` once per frame, then polls the `take_*`/`try_consume_*`
//! methods to learn whether to switch songs, start a preview or start
//! gameplay. Everything runs on the host's frame thread.

use super::{ParticipantCount, ReadinessRound, RoundKind, SelectionState, VoteOutcome};
use crate::config::{Config, ConfigError, ConfigResult};
use crate::identifier::{course_identifier, song_identifier, Course, Song};
use crate::protocol::{self, Message};
use crate::transport::{Transport, UdpTransport};

/// Upper bound on datagrams handled by one `tick()`; the rest wait for the next
pub const MAX_DATAGRAMS_PER_TICK: usize = 256;

/// Everything the wire can change
#[derive(Debug)]
struct SessionState {
    selection: SelectionState,
    preview: ReadinessRound,
    start: ReadinessRound,
    stall: bool,
}

impl SessionState {
    fn new(participants: ParticipantCount) -> Self {
        Self {
            selection: SelectionState::new(),
            preview: ReadinessRound::new(RoundKind::Preview, participants),
            start: ReadinessRound::new(RoundKind::Start, participants),
            stall: false,
        }
    }

    fn apply_datagram(&mut self, datagram: &[u8]) {
        match protocol::decode(datagram) {
            Ok(message) => self.apply(&message),
            Err(e) => tracing::debug!("Dropping datagram ({} bytes): {}", datagram.len(), e),
        }
    }

    fn apply(&mut self, message: &Message) {
        match message {
            Message::SongSelected { identifier } => {
                tracing::info!("Received SongSelected song \"{}\"", identifier);
                self.selection.record_remote(identifier);
            }
            Message::ReadyToPreview { frame, identifier } => {
                tracing::info!("Received ReadyToPreview frame {} song \"{}\"", frame, identifier);
                self.preview.record_vote(identifier, *frame);
            }
            Message::ReadyToStart { frame, identifier } => {
                tracing::info!("Received ReadyToStart frame {} song \"{}\"", frame, identifier);
                if let VoteOutcome::Decided { .. } = self.start.record_vote(identifier, *frame) {
                    self.stall = false;
                }
            }
        }
    }
}

/// One participant's view of a sync-start session
pub struct SyncStartManager<T: Transport = UdpTransport> {
    transport: T,
    participants: ParticipantCount,
    state: SessionState,
}

impl SyncStartManager<UdpTransport> {
    /// Open the configured UDP transport and start a session on it
    ///
    /// A transport that fails to open leaves the session disabled rather
    /// than failing; only an invalid participant count is an error.
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let participants = ParticipantCount::new(config.session.participants)
            .ok_or(ConfigError::NoParticipants)?;

        let transport = if config.network.enabled {
            UdpTransport::open(&config.network)
        } else {
            tracing::info!("Sync networking disabled by configuration");
            UdpTransport::disabled()
        };

        Ok(Self::new(transport, participants))
    }
}

impl<T: Transport> SyncStartManager<T> {
    pub fn new(transport: T, participants: ParticipantCount) -> Self {
        tracing::debug!(
            "Sync session for {} participants (transport enabled: {}, loopback: {})",
            participants,
            transport.is_enabled(),
            transport.loops_back()
        );

        Self {
            transport,
            participants,
            state: SessionState::new(participants),
        }
    }

    /// Whether datagrams are actually exchanged with other participants
    pub fn is_enabled(&self) -> bool {
        self.transport.is_enabled()
    }

    pub fn participants(&self) -> ParticipantCount {
        self.participants
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn announce_selected_song(&mut self, song: &Song) {
        self.announce_selected(&song_identifier(song));
    }

    pub fn announce_selected_course(&mut self, course: &Course) {
        self.announce_selected(&course_identifier(course));
    }

    /// Announce the local selection unless it was the last one announced
    pub fn announce_selected(&mut self, identifier: &str) {
        if !self.can_broadcast(identifier) || !self.state.selection.should_announce(identifier) {
            return;
        }

        tracing::info!("Broadcasting SongSelected song \"{}\"", identifier);
        self.broadcast(Message::SongSelected {
            identifier: identifier.to_string(),
        });
    }

    pub fn announce_ready_to_preview_song(&mut self, song: &Song, frame: i64) {
        self.announce_ready_to_preview(&song_identifier(song), frame);
    }

    pub fn announce_ready_to_preview_course(&mut self, course: &Course, frame: i64) {
        self.announce_ready_to_preview(&course_identifier(course), frame);
    }

    /// Vote to begin the preview of `identifier` at `frame` or later
    pub fn announce_ready_to_preview(&mut self, identifier: &str, frame: i64) {
        if !self.can_broadcast(identifier) {
            return;
        }

        tracing::info!("Broadcasting ReadyToPreview frame {} song \"{}\"", frame, identifier);
        self.broadcast(Message::ReadyToPreview {
            frame,
            identifier: identifier.to_string(),
        });
    }

    pub fn announce_ready_to_start_song(&mut self, song: &Song, frame: i64) {
        self.announce_ready_to_start(&song_identifier(song), frame);
    }

    pub fn announce_ready_to_start_course(&mut self, course: &Course, frame: i64) {
        self.announce_ready_to_start(&course_identifier(course), frame);
    }

    /// Vote to start gameplay of `identifier` at `frame` or later
    ///
    /// Stalls until the start round is decided or the song ends.
    pub fn announce_ready_to_start(&mut self, identifier: &str, frame: i64) {
        if !self.can_broadcast(identifier) {
            return;
        }

        self.state.stall = true;
        tracing::info!("Broadcasting ReadyToStart frame {} song \"{}\"", frame, identifier);
        self.broadcast(Message::ReadyToStart {
            frame,
            identifier: identifier.to_string(),
        });
    }

    /// Drain the transport and advance the session. Returns datagrams processed.
    ///
    /// At most `MAX_DATAGRAMS_PER_TICK` are handled so a flood on the port
    /// cannot hold up the frame loop.
    pub fn tick(&mut self) -> usize {
        let mut processed = 0;
        for datagram in self.transport.poll_receive().take(MAX_DATAGRAMS_PER_TICK) {
            self.state.apply_datagram(&datagram);
            processed += 1;
        }
        processed
    }

    /// The current song finished or was abandoned
    pub fn end_current_song(&mut self) {
        tracing::debug!("Ending current song, start round reset");
        self.state.start.clear_target();
        self.state.stall = false;
    }

    /// Selection announced by another participant since the last call
    pub fn take_pending_selection(&mut self) -> Option<String> {
        self.state.selection.take_pending()
    }

    /// Frame to start gameplay at, once per start decision
    pub fn try_consume_start(&mut self) -> Option<i64> {
        self.state.start.try_consume()
    }

    /// Frame to begin the preview at, once per preview decision
    pub fn try_consume_preview(&mut self) -> Option<i64> {
        self.state.preview.try_consume()
    }

    /// Gameplay must be held until the start round is decided
    pub fn should_stall(&self) -> bool {
        self.state.stall
    }

    pub fn preview_round(&self) -> &ReadinessRound {
        &self.state.preview
    }

    pub fn start_round(&self) -> &ReadinessRound {
        &self.state.start
    }

    fn can_broadcast(&self, identifier: &str) -> bool {
        if !self.transport.is_enabled() {
            return false;
        }
        if identifier.is_empty() {
            tracing::debug!("Not broadcasting an empty identifier");
            return false;
        }
        true
    }

    fn broadcast(&mut self, message: Message) {
        let payload = match protocol::encode(&message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Not broadcasting {}: {}", message.opcode(), e);
                return;
            }
        };

        self.transport.send(&payload);

        // Without loopback our own vote never comes back through tick()
        if !self.transport.loops_back() {
            match message {
                Message::SongSelected { .. } => {}
                _ => self.state.apply(&message),
            }
        }
    }
}
