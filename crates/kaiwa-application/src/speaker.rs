//! Speaker selection.

use std::sync::Arc;

use kaiwa_core::config::FavoredSpeakerConfig;
use kaiwa_core::persona::Persona;
use kaiwa_core::session::ConversationSession;
use rand::Rng;
use rand::seq::SliceRandom;

/// Picks who talks next.
#[derive(Debug, Clone, Default)]
pub struct SpeakerSelector {
    favored_id: Option<String>,
    favored_probability: f64,
}

impl SpeakerSelector {
    pub fn new(config: &FavoredSpeakerConfig) -> Self {
        Self {
            favored_id: config.persona_id.clone(),
            favored_probability: config.probability.clamp(0.0, 1.0),
        }
    }

    /// Selection when no question is pending.
    ///
    /// Participants who have not spoken go first. Otherwise the previous
    /// speaker sits out (unless nobody else is left) and the favored persona
    /// jumps the queue with its override chance.
    pub fn select<R: Rng + ?Sized>(
        &self,
        session: &ConversationSession,
        previous: Option<&str>,
        rng: &mut R,
    ) -> Option<Arc<Persona>> {
        let unspoken = session.unspoken();
        if !unspoken.is_empty() {
            return unspoken.choose(rng).cloned();
        }

        let pool = pool_without(session, previous);
        if let Some(favored) = self
            .favored_id
            .as_deref()
            .and_then(|id| pool.iter().find(|p| p.id == id))
        {
            if self.favored_probability > 0.0 && rng.gen_bool(self.favored_probability) {
                return Some(Arc::clone(favored));
            }
        }
        pool.choose(rng).cloned()
    }

    /// Selection when the latest turn by `asker` is a question.
    ///
    /// A named participant answers; an unaddressed question goes to anyone
    /// but the asker.
    pub fn answerer<R: Rng + ?Sized>(
        &self,
        session: &ConversationSession,
        asker: &str,
        addressee: Option<&str>,
        rng: &mut R,
    ) -> Option<Arc<Persona>> {
        if let Some(named) = addressee
            .filter(|id| *id != asker)
            .and_then(|id| session.participant(id))
        {
            return Some(Arc::clone(named));
        }
        pool_without(session, Some(asker)).choose(rng).cloned()
    }
}

fn pool_without(session: &ConversationSession, excluded: Option<&str>) -> Vec<Arc<Persona>> {
    let pool: Vec<_> = session
        .participants()
        .iter()
        .filter(|p| Some(p.id.as_str()) != excluded)
        .cloned()
        .collect();
    if pool.is_empty() {
        session.participants().to_vec()
    } else {
        pool
    }
}
