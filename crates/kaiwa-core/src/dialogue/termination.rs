//! End-of-conversation schedule.
//!
//! Termination is derived every turn from the turn index, participation
//! coverage and the latest text; nothing here is stored.

use rand::Rng;

use crate::config::{EndBand, TerminationConfig};
use crate::session::EndReason;

#[derive(Debug, Clone)]
pub struct EndSchedule {
    min_turn: usize,
    closing_keywords: Vec<String>,
    bands: Vec<EndBand>,
}

impl From<&TerminationConfig> for EndSchedule {
    fn from(config: &TerminationConfig) -> Self {
        Self {
            min_turn: config.min_turn,
            closing_keywords: config.closing_keywords.clone(),
            bands: config.bands.clone(),
        }
    }
}

impl Default for EndSchedule {
    fn default() -> Self {
        Self::from(&TerminationConfig::default())
    }
}

impl EndSchedule {
    pub fn min_turn(&self) -> usize {
        self.min_turn
    }

    /// Whether `text` contains one of the closing phrases.
    pub fn has_closing_keyword(&self, text: &str) -> bool {
        self.closing_keywords
            .iter()
            .any(|keyword| text.contains(keyword.as_str()))
    }

    /// Hard end condition for turn `turn_index`.
    pub fn should_end(&self, turn_index: usize, text: &str) -> bool {
        turn_index >= self.min_turn && self.has_closing_keyword(text)
    }

    /// Chance of ending after turn `turn_index`.
    ///
    /// Always 0 until every participant has spoken.
    pub fn probability(&self, turn_index: usize, all_have_spoken: bool) -> f64 {
        if !all_have_spoken || turn_index < self.min_turn {
            return 0.0;
        }
        self.bands
            .iter()
            .take_while(|band| band.min_turn <= turn_index)
            .last()
            .map_or(0.0, |band| band.probability)
    }

    /// Evaluates termination after turn `turn_index` produced `text`.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        turn_index: usize,
        text: &str,
        all_have_spoken: bool,
        rng: &mut R,
    ) -> Option<EndReason> {
        if self.should_end(turn_index, text) {
            return Some(EndReason::ClosingKeyword { turn_index });
        }
        let probability = self.probability(turn_index, all_have_spoken);
        if probability > 0.0 && rng.gen_bool(probability.min(1.0)) {
            return Some(EndReason::Probability {
                turn_index,
                probability,
            });
        }
        None
    }
}
