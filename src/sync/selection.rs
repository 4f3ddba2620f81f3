//! Song/course selection tracking

/// Selection announcements, local and remote
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pending: Option<String>,
    last_broadcast: Option<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `identifier` needs announcing. Marks it as announced if so.
    pub fn should_announce(&mut self, identifier: &str) -> bool {
        if self.last_broadcast.as_deref() == Some(identifier) {
            return false;
        }
        self.last_broadcast = Some(identifier.to_string());
        true
    }

    /// Adopt a selection announced on the wire
    ///
    /// It also becomes the broadcast baseline, so the host switching to it
    /// does not echo it back.
    pub fn record_remote(&mut self, identifier: &str) {
        self.pending = Some(identifier.to_string());
        self.last_broadcast = Some(identifier.to_string());
    }

    /// Take the selection the host should switch to, once
    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn last_broadcast(&self) -> Option<&str> {
        self.last_broadcast.as_deref()
    }
}
