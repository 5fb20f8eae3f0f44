//! Conversation session model.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::turn::Turn;
use crate::error::{KaiwaError, Result};
use crate::persona::Persona;

/// Minimum number of distinct personas in a conversation.
pub const MIN_PARTICIPANTS: usize = 2;

/// A chat channel a conversation is presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DestinationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// The drawn turn cap was reached.
    TurnCap,
    /// The latest turn contained a closing phrase.
    ClosingKeyword { turn_index: usize },
    /// The end-probability draw succeeded.
    Probability { turn_index: usize, probability: f64 },
    /// Too many consecutive turns produced nothing usable.
    Stalled { consecutive_failures: usize },
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnCap => write!(f, "turn cap reached"),
            Self::ClosingKeyword { turn_index } => {
                write!(f, "closing keyword at turn {turn_index}")
            }
            Self::Probability {
                turn_index,
                probability,
            } => write!(f, "ended by chance at turn {turn_index} (p={probability})"),
            Self::Stalled {
                consecutive_failures,
            } => write!(f, "stalled after {consecutive_failures} failed turns"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Running,
    Ended(EndReason),
}

/// One bounded multi-persona conversation in a destination.
///
/// Holds the participant set and the coverage of who has spoken. The turns
/// themselves live in the history store under `id`.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub id: String,
    pub destination: DestinationId,
    pub topic: String,
    pub started_at: DateTime<Utc>,
    participants: Vec<Arc<Persona>>,
    state: SessionState,
    spoken: HashSet<String>,
}

impl ConversationSession {
    /// Creates a running session.
    ///
    /// Duplicate personas are collapsed; fewer than two distinct participants
    /// is refused.
    pub fn new(
        destination: DestinationId,
        participants: Vec<Arc<Persona>>,
        topic: impl Into<String>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let participants: Vec<_> = participants
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();

        if participants.len() < MIN_PARTICIPANTS {
            return Err(KaiwaError::insufficient_participants(
                MIN_PARTICIPANTS,
                participants.len(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            destination,
            topic: topic.into(),
            started_at: Utc::now(),
            participants,
            state: SessionState::Running,
            spoken: HashSet::new(),
        })
    }

    pub fn participants(&self) -> &[Arc<Persona>] {
        &self.participants
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    pub fn participant(&self, id: &str) -> Option<&Arc<Persona>> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn is_participant(&self, id: &str) -> bool {
        self.participant(id).is_some()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running)
    }

    pub fn has_spoken(&self, id: &str) -> bool {
        self.spoken.contains(id)
    }

    /// Every participant has produced at least one turn.
    pub fn all_have_spoken(&self) -> bool {
        self.participants.iter().all(|p| self.spoken.contains(&p.id))
    }

    /// Participants who have not produced a turn yet, in participant order.
    pub fn unspoken(&self) -> Vec<Arc<Persona>> {
        self.participants
            .iter()
            .filter(|p| !self.spoken.contains(&p.id))
            .cloned()
            .collect()
    }

    /// Accepts a turn into the session's coverage.
    ///
    /// Rejects speakers outside the participant set and turns after the
    /// session has ended.
    pub fn admit(&mut self, turn: &Turn) -> Result<()> {
        if !self.is_running() {
            return Err(KaiwaError::invariant(format!(
                "session {} has ended, turn by '{}' rejected",
                self.id, turn.speaker_id
            )));
        }
        if !self.is_participant(&turn.speaker_id) {
            return Err(KaiwaError::invariant(format!(
                "'{}' is not a participant of session {}",
                turn.speaker_id, self.id
            )));
        }
        self.spoken.insert(turn.speaker_id.clone());
        Ok(())
    }

    pub fn end(&mut self, reason: EndReason) {
        if self.is_running() {
            tracing::debug!(session_id = %self.id, %reason, "Session ended");
            self.state = SessionState::Ended(reason);
        }
    }
}
