//! Readiness quorum rounds
//!
//! Each participant proposes the earliest frame it can be ready by. A round
//! is decided once every participant has voted for the same target, and
//! the agreed frame is the latest of the proposals so nobody is asked to
//! start before it said it could.

use super::{ParticipantCount, RoundKind};

/// What a single vote did to a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote named a different target; previous progress was discarded
    NewTarget { remaining: u32 },
    /// The vote was counted, more are needed
    Counted { remaining: u32 },
    /// Every participant has voted; `frame` is the agreed frame
    Decided { frame: i64 },
}

/// One quorum round (preview or start)
#[derive(Debug, Clone)]
pub struct ReadinessRound {
    kind: RoundKind,
    participants: ParticipantCount,
    target: Option<String>,
    agreed_frame: i64,
    remaining_votes: u32,
    decided: bool,
}

impl ReadinessRound {
    pub fn new(kind: RoundKind, participants: ParticipantCount) -> Self {
        Self {
            kind,
            participants,
            target: None,
            agreed_frame: 0,
            remaining_votes: participants.votes_after_first(),
            decided: false,
        }
    }

    /// Identifier currently being voted on
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn agreed_frame(&self) -> i64 {
        self.agreed_frame
    }

    pub fn remaining_votes(&self) -> u32 {
        self.remaining_votes
    }

    /// Decided and not yet consumed
    pub fn is_decided(&self) -> bool {
        self.decided
    }

    /// Count a vote for `identifier` that can be ready at `frame`
    pub fn record_vote(&mut self, identifier: &str, frame: i64) -> VoteOutcome {
        if self.target.as_deref() != Some(identifier) {
            // The incoming vote is the first of the new round
            self.target = Some(identifier.to_string());
            self.agreed_frame = frame;
            self.remaining_votes = self.participants.votes_after_first();
            self.decided = self.remaining_votes == 0;

            tracing::debug!(
                "{} round retargeted to \"{}\" at frame {}, {} vote(s) outstanding",
                self.kind,
                identifier,
                frame,
                self.remaining_votes
            );

            return if self.decided {
                VoteOutcome::Decided { frame }
            } else {
                VoteOutcome::NewTarget { remaining: self.remaining_votes }
            };
        }

        self.remaining_votes = self.remaining_votes.saturating_sub(1);
        self.agreed_frame = self.agreed_frame.max(frame);
        self.decided = self.remaining_votes == 0;

        if self.decided {
            tracing::debug!(
                "{} round decided for \"{}\" at frame {}",
                self.kind,
                identifier,
                self.agreed_frame
            );
            VoteOutcome::Decided { frame: self.agreed_frame }
        } else {
            VoteOutcome::Counted { remaining: self.remaining_votes }
        }
    }

    /// Hand out the agreed frame once per decision
    pub fn try_consume(&mut self) -> Option<i64> {
        if !self.decided {
            return None;
        }
        self.decided = false;
        Some(self.agreed_frame)
    }

    /// Forget the target so the next vote opens a fresh round
    pub fn clear_target(&mut self) {
        self.target = None;
        self.decided = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(n: u32) -> ReadinessRound {
        ReadinessRound::new(RoundKind::Start, ParticipantCount::new(n).unwrap())
    }

    #[test]
    fn test_decides_after_n_votes_exactly_once() {
        for n in 1..=5 {
            let mut r = round(n);
            for vote in 0..n {
                assert!(!r.is_decided(), "n={} decided early at vote {}", n, vote);
                r.record_vote("Pack/Song", 10);
            }
            assert!(r.is_decided());
            assert_eq!(r.try_consume(), Some(10));
            assert_eq!(r.try_consume(), None);
        }
    }

    #[test]
    fn test_agreed_frame_is_latest_proposal() {
        let mut r = round(4);
        r.record_vote("Pack/Song", 300);
        r.record_vote("Pack/Song", 120);
        r.record_vote("Pack/Song", 450);
        assert_eq!(
            r.record_vote("Pack/Song", -5),
            VoteOutcome::Decided { frame: 450 }
        );
        assert_eq!(r.try_consume(), Some(450));
    }

    #[test]
    fn test_new_target_discards_progress() {
        let mut r = round(2);
        r.record_vote("A", 100);
        r.record_vote("A", 100);
        assert!(r.is_decided());
        assert_eq!(r.remaining_votes(), 0);

        assert_eq!(r.record_vote("B", 50), VoteOutcome::NewTarget { remaining: 1 });
        assert!(!r.is_decided());
        assert_eq!(r.target(), Some("B"));
        assert_eq!(r.remaining_votes(), 1);
        assert_eq!(r.agreed_frame(), 50);
        assert_eq!(r.try_consume(), None);
    }

    #[test]
    fn test_remaining_votes_saturates() {
        let mut r = round(2);
        for _ in 0..10 {
            r.record_vote("A", 1);
        }
        assert_eq!(r.remaining_votes(), 0);
    }

    #[test]
    fn test_duplicate_vote_rearms_decision() {
        let mut r = round(2);
        r.record_vote("A", 1);
        r.record_vote("A", 2);
        assert_eq!(r.try_consume(), Some(2));

        // Indistinguishable from another participant voting again
        assert_eq!(r.record_vote("A", 3), VoteOutcome::Decided { frame: 3 });
        assert_eq!(r.try_consume(), Some(3));
    }

    #[test]
    fn test_clear_target_opens_fresh_round() {
        let mut r = round(2);
        r.record_vote("A", 7);
        r.record_vote("A", 9);
        r.clear_target();
        assert!(!r.is_decided());
        assert_eq!(r.target(), None);

        assert_eq!(r.record_vote("A", 11), VoteOutcome::NewTarget { remaining: 1 });
        assert_eq!(r.agreed_frame(), 11);
    }

    #[test]
    fn test_empty_identifier_is_a_target_like_any_other() {
        let mut r = round(2);
        assert_eq!(r.record_vote("", 0), VoteOutcome::NewTarget { remaining: 1 });
        assert_eq!(r.record_vote("", 0), VoteOutcome::Decided { frame: 0 });
    }
}
