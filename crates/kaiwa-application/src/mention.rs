//! Mention-triggered persona responses.
//!
//! A user mentioning the bot opens a short exchange in that channel: one or
//! two personas are picked and take turns answering until the response
//! budget is spent, a chance ending fires, or the channel goes quiet long
//! enough for the exchange to start over.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use kaiwa_core::persona::{Persona, PersonaRegistry};
use kaiwa_core::session::DestinationId;
use kaiwa_infrastructure::InteractionConfig;
use rand::Rng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
struct Exchange {
    last_interaction: DateTime<Utc>,
    responses: usize,
    participants: Vec<Arc<Persona>>,
    closed: bool,
}

impl Exchange {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_interaction: now,
            responses: 0,
            participants: Vec::new(),
            closed: false,
        }
    }
}

type ExchangeMap = Mutex<HashMap<DestinationId, Exchange>>;

pub struct MentionTracker {
    config: InteractionConfig,
    registry: Arc<PersonaRegistry>,
    exchanges: ExchangeMap,
}

impl MentionTracker {
    pub fn new(config: InteractionConfig, registry: Arc<PersonaRegistry>) -> Self {
        Self {
            config,
            registry,
            exchanges: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DestinationId, Exchange>> {
        self.exchanges
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The exchange in `destination`, restarted if it has gone quiet.
    fn current<'a>(
        &self,
        map: &'a mut HashMap<DestinationId, Exchange>,
        destination: DestinationId,
        now: DateTime<Utc>,
    ) -> &'a mut Exchange {
        let timeout = Duration::minutes(self.config.timeout_minutes);
        let exchange = map
            .entry(destination)
            .or_insert_with(|| Exchange::new(now));
        if now - exchange.last_interaction > timeout {
            tracing::debug!(%destination, "Mention exchange timed out, starting over");
            *exchange = Exchange::new(now);
        }
        exchange
    }

    /// Chooses who answers a mention, or `None` when the exchange is over.
    pub fn pick_responder<R: Rng + ?Sized>(
        &self,
        destination: DestinationId,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<Arc<Persona>> {
        let mut map = self.lock();
        let exchange = self.current(&mut map, destination, now);
        if exchange.closed || exchange.responses >= self.config.max_responses {
            return None;
        }

        if exchange.participants.is_empty() {
            let available = self.registry.list_active().len();
            let max = self.config.max_participants.min(available);
            if max < self.config.min_participants {
                return None;
            }
            let count = rng.gen_range(self.config.min_participants..=max);
            exchange.participants = self.registry.sample(count, rng).ok()?;
        }
        exchange.participants.choose(rng).cloned()
    }

    /// Counts a delivered mention response; the exchange may end here.
    pub fn record_response<R: Rng + ?Sized>(
        &self,
        destination: DestinationId,
        now: DateTime<Utc>,
        rng: &mut R,
    ) {
        let mut map = self.lock();
        let exchange = self.current(&mut map, destination, now);
        exchange.last_interaction = now;
        exchange.responses += 1;
        if exchange.responses >= self.config.end_after
            && self.config.end_probability > 0.0
            && rng.gen_bool(self.config.end_probability)
        {
            tracing::debug!(%destination, responses = exchange.responses, "Mention exchange ended");
            exchange.closed = true;
        }
    }

    /// A reply to `persona` joins it to the exchange without using the budget.
    pub fn record_reply(&self, destination: DestinationId, persona: &Arc<Persona>, now: DateTime<Utc>) {
        let mut map = self.lock();
        let exchange = self.current(&mut map, destination, now);
        exchange.last_interaction = now;
        if !exchange.participants.iter().any(|p| p.id == persona.id) {
            exchange.participants.push(Arc::clone(persona));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaiwa_core::persona::get_default_presets;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tracker(config: InteractionConfig) -> MentionTracker {
        MentionTracker::new(config, Arc::new(PersonaRegistry::new(get_default_presets())))
    }

    fn never_ends() -> InteractionConfig {
        InteractionConfig {
            end_probability: 0.0,
            ..InteractionConfig::default()
        }
    }

    #[test]
    fn responders_come_from_a_small_fixed_group() {
        let tracker = tracker(InteractionConfig {
            max_responses: 50,
            ..never_ends()
        });
        let mut rng = StdRng::seed_from_u64(3);
        let now = Utc::now();
        let dest = DestinationId(1);

        let mut seen: Vec<String> = Vec::new();
        for _ in 0..20 {
            let persona = tracker.pick_responder(dest, now, &mut rng).unwrap();
            if !seen.contains(&persona.id) {
                seen.push(persona.id.clone());
            }
            tracker.record_response(dest, now, &mut rng);
        }
        assert!((1..=2).contains(&seen.len()));
    }

    #[test]
    fn budget_is_spent_after_max_responses() {
        let tracker = tracker(never_ends());
        let mut rng = StdRng::seed_from_u64(5);
        let now = Utc::now();
        let dest = DestinationId(2);

        for _ in 0..3 {
            assert!(tracker.pick_responder(dest, now, &mut rng).is_some());
            tracker.record_response(dest, now, &mut rng);
        }
        assert!(tracker.pick_responder(dest, now, &mut rng).is_none());
        assert!(tracker.pick_responder(DestinationId(3), now, &mut rng).is_some());
    }

    #[test]
    fn quiet_channel_starts_over() {
        let tracker = tracker(never_ends());
        let mut rng = StdRng::seed_from_u64(6);
        let start = Utc::now();
        let dest = DestinationId(4);
        for _ in 0..3 {
            tracker.pick_responder(dest, start, &mut rng);
            tracker.record_response(dest, start, &mut rng);
        }
        assert!(tracker.pick_responder(dest, start + Duration::minutes(10), &mut rng).is_none());
        assert!(tracker.pick_responder(dest, start + Duration::minutes(31), &mut rng).is_some());
    }

    #[test]
    fn certain_ending_closes_after_the_second_response() {
        let tracker = tracker(InteractionConfig {
            end_probability: 1.0,
            max_responses: 10,
            ..InteractionConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let dest = DestinationId(5);

        tracker.pick_responder(dest, now, &mut rng).unwrap();
        tracker.record_response(dest, now, &mut rng);
        assert!(tracker.pick_responder(dest, now, &mut rng).is_some());
        tracker.record_response(dest, now, &mut rng);
        assert!(tracker.pick_responder(dest, now, &mut rng).is_none());
    }

    #[test]
    fn replied_persona_joins_without_spending_budget() {
        let tracker = tracker(InteractionConfig {
            max_responses: 1,
            ..never_ends()
        });
        let mut rng = StdRng::seed_from_u64(8);
        let now = Utc::now();
        let dest = DestinationId(6);
        let dynaka = Arc::new(
            get_default_presets()
                .into_iter()
                .find(|p| p.id == "ai_king_dynaka")
                .unwrap(),
        );

        tracker.record_reply(dest, &dynaka, now);
        tracker.record_reply(dest, &dynaka, now);
        let picked = tracker.pick_responder(dest, now, &mut rng).unwrap();
        assert_eq!(picked.id, "ai_king_dynaka");
        tracker.record_response(dest, now, &mut rng);
        assert!(tracker.pick_responder(dest, now, &mut rng).is_none());
    }
}
