//! In-memory conversation history.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::turn::Turn;
use crate::error::{KaiwaError, Result};

/// Ordered turns per session id.
///
/// Each session has a single writer (its turn loop); readers only take
/// bounded suffixes.
#[derive(Debug, Default)]
pub struct ConversationHistoryStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl ConversationHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn to the end of a session's history.
    ///
    /// Rejects a turn stamped earlier than the session's latest turn.
    pub async fn append(&self, session_id: &str, turn: Turn) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        if let Some(last) = turns.last() {
            if turn.timestamp < last.timestamp {
                return Err(KaiwaError::invariant(format!(
                    "turn by '{}' at {} precedes the latest turn at {} in session {session_id}",
                    turn.speaker_id, turn.timestamp, last.timestamp
                )));
            }
        }
        turns.push(turn);
        Ok(())
    }

    /// The last `n` turns of a session, oldest first.
    pub async fn tail(&self, session_id: &str, n: usize) -> Vec<Turn> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|turns| turns[turns.len().saturating_sub(n)..].to_vec())
            .unwrap_or_default()
    }

    /// The most recent turn of a session.
    pub async fn last(&self, session_id: &str) -> Option<Turn> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).and_then(|turns| turns.last().cloned())
    }

    pub async fn all(&self, session_id: &str) -> Vec<Turn> {
        self.tail(session_id, usize::MAX).await
    }

    pub async fn len(&self, session_id: &str) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map_or(0, Vec::len)
    }

    /// Drops a session's history. Returns how many turns were removed.
    pub async fn clear(&self, session_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).map_or(0, |turns| turns.len())
    }
}
