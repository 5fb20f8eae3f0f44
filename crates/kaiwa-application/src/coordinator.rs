//! Per-channel coordination.
//!
//! At most one conversation runs in a destination at a time. The coordinator
//! owns that rule, the history of superseded sessions and the last-activity
//! record the scheduler consults.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use kaiwa_core::error::{KaiwaError, Result};
use kaiwa_core::persona::{Persona, PersonaRegistry};
use kaiwa_core::session::{ConversationSession, DestinationId};
use rand::Rng;

use crate::orchestrator::{SessionReport, TurnOrchestrator};
use crate::topics::TopicCatalogue;

#[derive(Debug, Clone, Default)]
struct ChannelState {
    in_progress: bool,
    last_activity: Option<DateTime<Utc>>,
    last_session_id: Option<String>,
}

type ChannelMap = Mutex<HashMap<DestinationId, ChannelState>>;

fn lock(channels: &ChannelMap) -> MutexGuard<'_, HashMap<DestinationId, ChannelState>> {
    channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks a destination busy for as long as it lives.
struct ChannelGuard<'a> {
    channels: &'a ChannelMap,
    destination: DestinationId,
}

impl<'a> ChannelGuard<'a> {
    fn acquire(channels: &'a ChannelMap, destination: DestinationId) -> Result<Self> {
        let mut map = lock(channels);
        let state = map.entry(destination).or_default();
        if state.in_progress {
            return Err(KaiwaError::SessionInProgress {
                destination: destination.0,
            });
        }
        state.in_progress = true;
        Ok(Self {
            channels,
            destination,
        })
    }
}

impl Drop for ChannelGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = lock(self.channels).get_mut(&self.destination) {
            state.in_progress = false;
        }
    }
}

pub struct ChannelCoordinator {
    orchestrator: Arc<TurnOrchestrator>,
    registry: Arc<PersonaRegistry>,
    topics: TopicCatalogue,
    channels: ChannelMap,
}

impl ChannelCoordinator {
    pub fn new(orchestrator: Arc<TurnOrchestrator>, registry: Arc<PersonaRegistry>) -> Self {
        Self {
            orchestrator,
            registry,
            topics: TopicCatalogue::default(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_topics(mut self, topics: TopicCatalogue) -> Self {
        self.topics = topics;
        self
    }

    pub fn registry(&self) -> &Arc<PersonaRegistry> {
        &self.registry
    }

    pub fn orchestrator(&self) -> &Arc<TurnOrchestrator> {
        &self.orchestrator
    }

    /// Runs a conversation in `destination` unless one is already running.
    ///
    /// Once the new session is accepted, the previous session's history in
    /// that destination is discarded. A refused start leaves it untouched.
    pub async fn start_session(
        &self,
        destination: DestinationId,
        participants: Vec<Arc<Persona>>,
        topic: impl Into<String>,
    ) -> Result<SessionReport> {
        let _guard = ChannelGuard::acquire(&self.channels, destination)?;
        let session = ConversationSession::new(destination, participants, topic)?;

        let superseded = lock(&self.channels)
            .entry(destination)
            .or_default()
            .last_session_id
            .replace(session.id.clone());
        if let Some(previous) = superseded {
            let removed = self.orchestrator.history().clear(&previous).await;
            tracing::debug!(%destination, session_id = %previous, removed, "Cleared superseded history");
        }

        let report = self.orchestrator.run(session).await;
        lock(&self.channels)
            .entry(destination)
            .or_default()
            .last_activity = Some(report.ended_at);
        Ok(report)
    }

    /// Samples participants and a topic, then runs a conversation.
    pub async fn start_random_session<R: Rng + Send + ?Sized>(
        &self,
        destination: DestinationId,
        rng: &mut R,
    ) -> Result<SessionReport> {
        let range = self.orchestrator.config().participants;
        let available = self.registry.list_active().len();
        let max = range.max.min(available);
        let count = if max >= range.min {
            rng.gen_range(range.min..=max)
        } else {
            range.min
        };
        let participants = self.registry.sample(count, rng)?;
        let topic = self
            .topics
            .pick(&participants, rng)
            .ok_or_else(|| KaiwaError::config("topic catalogue is empty"))?;

        tracing::info!(
            %destination,
            topic = %topic,
            participants = ?participants.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            "Starting conversation"
        );
        self.start_session(destination, participants, topic).await
    }

    pub fn is_busy(&self, destination: DestinationId) -> bool {
        lock(&self.channels)
            .get(&destination)
            .is_some_and(|state| state.in_progress)
    }

    /// The most recent session started in `destination`, finished or not.
    pub fn last_session_id(&self, destination: DestinationId) -> Option<String> {
        lock(&self.channels)
            .get(&destination)
            .and_then(|state| state.last_session_id.clone())
    }

    /// When the last conversation in `destination` finished.
    pub fn last_activity(&self, destination: DestinationId) -> Option<DateTime<Utc>> {
        lock(&self.channels)
            .get(&destination)
            .and_then(|state| state.last_activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_on_drop() {
        let channels: ChannelMap = Mutex::new(HashMap::new());
        let dest = DestinationId(3);
        {
            let _held = ChannelGuard::acquire(&channels, dest).unwrap();
            let err = ChannelGuard::acquire(&channels, dest).err().unwrap();
            assert!(matches!(err, KaiwaError::SessionInProgress { destination: 3 }));
            assert!(ChannelGuard::acquire(&channels, DestinationId(4)).is_ok());
        }
        assert!(ChannelGuard::acquire(&channels, dest).is_ok());
    }
}
