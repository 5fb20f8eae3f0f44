//! Conversation policy configuration.
//!
//! Every number that shapes a conversation (turn caps, end bands, pacing,
//! favoritism, mentor framing) lives here as data so it can be replaced from
//! the `[chat]` section of the config file.

use serde::{Deserialize, Serialize};

use crate::error::{KaiwaError, Result};
use crate::persona::{KING_DYNAKA_ID, YAMADA_MENTOR_ID};

/// Top-level conversation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub turns: TurnRange,
    pub participants: ParticipantRange,
    pub termination: TerminationConfig,
    pub trim: TrimConfig,
    pub pacing: PacingConfig,
    pub favored: FavoredSpeakerConfig,
    pub mentor: MentorConfig,
    pub question: QuestionLexicon,
    /// Turns handed to the generator as context
    pub context_turns: usize,
    /// Turns quoted in a continuation prompt
    pub quote_turns: usize,
    /// Shortest usable reply, in chars after trimming whitespace
    pub min_reply_chars: usize,
    /// Consecutive skipped turns that stall a session
    pub max_consecutive_failures: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            turns: TurnRange::default(),
            participants: ParticipantRange::default(),
            termination: TerminationConfig::default(),
            trim: TrimConfig::default(),
            pacing: PacingConfig::default(),
            favored: FavoredSpeakerConfig::default(),
            mentor: MentorConfig::default(),
            question: QuestionLexicon::default(),
            context_turns: 5,
            quote_turns: 3,
            min_reply_chars: 2,
            max_consecutive_failures: 3,
        }
    }
}

impl ChatConfig {
    /// Checks the policy for inconsistent ranges and schedules.
    pub fn validate(&self) -> Result<()> {
        if self.turns.min == 0 || self.turns.min > self.turns.max {
            return Err(KaiwaError::config(format!(
                "chat.turns: min ({}) must be in 1..=max ({})",
                self.turns.min, self.turns.max
            )));
        }
        if self.participants.min < 2 || self.participants.min > self.participants.max {
            return Err(KaiwaError::config(format!(
                "chat.participants: min ({}) must be at least 2 and not above max ({})",
                self.participants.min, self.participants.max
            )));
        }
        if self.pacing.min_ms > self.pacing.max_ms {
            return Err(KaiwaError::config(format!(
                "chat.pacing: min_ms ({}) exceeds max_ms ({})",
                self.pacing.min_ms, self.pacing.max_ms
            )));
        }
        if self.max_consecutive_failures == 0 {
            return Err(KaiwaError::config(
                "chat.max_consecutive_failures must be at least 1",
            ));
        }

        self.termination.validate()?;
        self.trim.validate()?;

        check_probability("chat.favored.probability", self.favored.probability)?;
        check_probability("chat.mentor.probability", self.mentor.probability)?;
        check_probability(
            "chat.mentor.closing_probability",
            self.mentor.closing_probability,
        )?;
        Ok(())
    }
}

fn check_probability(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(KaiwaError::config(format!(
            "{field} must be within [0, 1], got {value}"
        )))
    }
}

/// Inclusive bounds the per-session turn cap is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRange {
    pub min: usize,
    pub max: usize,
}

impl Default for TurnRange {
    fn default() -> Self {
        Self { min: 16, max: 22 }
    }
}

/// How many personas a randomly started session gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRange {
    pub min: usize,
    pub max: usize,
}

impl Default for ParticipantRange {
    fn default() -> Self {
        Self { min: 2, max: 3 }
    }
}

/// One step of the end-probability schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndBand {
    pub min_turn: usize,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    /// First turn index at which termination is evaluated
    pub min_turn: usize,
    pub closing_keywords: Vec<String>,
    /// Sorted by `min_turn`
    pub bands: Vec<EndBand>,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            min_turn: 8,
            closing_keywords: ["また今度", "またね", "じゃあね", "それでは", "おつかれ", "お疲れ様", "ではまた"]
                .into_iter()
                .map(String::from)
                .collect(),
            bands: vec![
                EndBand { min_turn: 0, probability: 0.0 },
                EndBand { min_turn: 14, probability: 0.15 },
                EndBand { min_turn: 16, probability: 0.3 },
                EndBand { min_turn: 18, probability: 0.6 },
            ],
        }
    }
}

impl TerminationConfig {
    fn validate(&self) -> Result<()> {
        let mut previous: Option<&EndBand> = None;
        for band in &self.bands {
            check_probability("chat.termination.bands.probability", band.probability)?;
            if let Some(prev) = previous {
                if band.min_turn <= prev.min_turn {
                    return Err(KaiwaError::config(format!(
                        "chat.termination.bands must be sorted by min_turn ({} after {})",
                        band.min_turn, prev.min_turn
                    )));
                }
                if band.probability < prev.probability {
                    return Err(KaiwaError::config(format!(
                        "chat.termination.bands probabilities must not decrease ({} after {})",
                        band.probability, prev.probability
                    )));
                }
            }
            previous = Some(band);
        }
        if self.closing_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(KaiwaError::config(
                "chat.termination.closing_keywords must not contain empty entries",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Longest reply kept, in chars
    pub max_chars: usize,
    /// Prefix searched for a sentence end when cutting
    pub sentence_window: usize,
    pub ellipsis: String,
    pub sentence_marks: String,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            max_chars: 120,
            sentence_window: 115,
            ellipsis: "...".to_string(),
            sentence_marks: "。！？!?．.".to_string(),
        }
    }
}

impl TrimConfig {
    fn validate(&self) -> Result<()> {
        let ellipsis_len = self.ellipsis.chars().count();
        if self.max_chars <= ellipsis_len {
            return Err(KaiwaError::config(format!(
                "chat.trim.max_chars ({}) must exceed the ellipsis length ({ellipsis_len})",
                self.max_chars
            )));
        }
        if self.sentence_window > self.max_chars {
            return Err(KaiwaError::config(format!(
                "chat.trim.sentence_window ({}) exceeds max_chars ({})",
                self.sentence_window, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Delay between produced turns, drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 2000,
            max_ms: 5000,
        }
    }
}

impl PacingConfig {
    /// No delay at all; used by dry runs and tests.
    pub fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }
}

/// A persona that wins speaker selection more often than chance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoredSpeakerConfig {
    pub persona_id: Option<String>,
    pub probability: f64,
}

impl Default for FavoredSpeakerConfig {
    fn default() -> Self {
        Self {
            persona_id: Some(KING_DYNAKA_ID.to_string()),
            probability: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentorConfig {
    pub persona_id: Option<String>,
    /// First turn index eligible for mentor framing
    pub min_turn: usize,
    pub probability: f64,
    pub references: Vec<String>,
    /// First turn index eligible for the closing summary
    pub closing_turn: usize,
    pub closing_probability: f64,
}

impl Default for MentorConfig {
    fn default() -> Self {
        Self {
            persona_id: Some(YAMADA_MENTOR_ID.to_string()),
            min_turn: 6,
            probability: 0.3,
            references: [
                "解の質より問いの質",
                "リーンスタートアップの構築・計測・学習",
                "顧客が片付けたいジョブ",
                "ピーター・ドラッカーの「顧客の創造」",
                "小さく始めて早く失敗する",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            closing_turn: 14,
            closing_probability: 0.5,
        }
    }
}

/// Words that mark a text as a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionLexicon {
    /// Substrings that make any text a question (e.g. `？`)
    pub markers: Vec<String>,
    /// Sentence endings that make a text a question
    pub endings: Vec<String>,
}

impl Default for QuestionLexicon {
    fn default() -> Self {
        Self {
            markers: vec!["？".to_string(), "?".to_string()],
            endings: ["ですか", "ますか", "でしょうか", "かな", "どう思う", "どうかな"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
