//! Conversation topics for spontaneous sessions.

use std::sync::Arc;

use kaiwa_core::persona::{KING_DYNAKA_ID, Persona};
use rand::Rng;
use rand::seq::SliceRandom;

const EVERYDAY_TOPICS: &[&str] = &[
    "最近の技術トレンドについて",
    "好きな音楽について",
    "おすすめの本について",
    "今日の天気について",
    "最新のニュースについて",
    "趣味について",
    "最近見た映画について",
    "起業のアイデアについて",
    "マーケティング戦略について",
    "プログラミングの面白さについて",
];

const FITNESS_TOPICS: &[&str] = &[
    "筋トレの素晴らしさについて",
    "プロテインの効果について",
    "モチベーション向上の秘訣について",
    "体力づくりの重要性について",
];

/// Topic pool, with extra topics unlocked by specific participants.
#[derive(Debug, Clone)]
pub struct TopicCatalogue {
    base: Vec<String>,
    extras: Vec<(String, Vec<String>)>,
}

impl Default for TopicCatalogue {
    fn default() -> Self {
        Self {
            base: EVERYDAY_TOPICS.iter().map(|t| t.to_string()).collect(),
            extras: vec![(
                KING_DYNAKA_ID.to_string(),
                FITNESS_TOPICS.iter().map(|t| t.to_string()).collect(),
            )],
        }
    }
}

impl TopicCatalogue {
    pub fn new(base: Vec<String>) -> Self {
        Self {
            base,
            extras: Vec::new(),
        }
    }

    /// Adds topics that become available when `persona_id` participates.
    pub fn with_extra(mut self, persona_id: impl Into<String>, topics: Vec<String>) -> Self {
        self.extras.push((persona_id.into(), topics));
        self
    }

    pub fn candidates(&self, participants: &[Arc<Persona>]) -> Vec<&str> {
        let mut topics: Vec<&str> = self.base.iter().map(String::as_str).collect();
        for (persona_id, extra) in &self.extras {
            if participants.iter().any(|p| &p.id == persona_id) {
                topics.extend(extra.iter().map(String::as_str));
            }
        }
        topics
    }

    pub fn pick<R: Rng + ?Sized>(&self, participants: &[Arc<Persona>], rng: &mut R) -> Option<String> {
        self.candidates(participants)
            .choose(rng)
            .map(|topic| topic.to_string())
    }
}
