//! Turn types.
//!
//! A turn is one persona's utterance inside a conversation, recorded after
//! its text has been generated, trimmed and presented.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::persona::Persona;

/// What a turn was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnKind {
    /// Ordinary contribution chosen by speaker selection.
    Regular,
    /// Reply to a question raised by the previous turn.
    Answer,
    /// The mentor's wrap-up of the discussion.
    MentorSummary,
    /// A participant's reaction to the mentor's wrap-up.
    ClosingReaction,
}

/// A single recorded utterance. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker_id: String,
    pub speaker_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Main-loop turn index the turn was produced in.
    pub index: usize,
    pub kind: TurnKind,
    /// The text asks something of the other participants.
    pub is_question: bool,
    /// The turn was produced to resolve a pending question.
    pub answers_question: bool,
}

impl Turn {
    pub fn new(
        speaker: &Persona,
        text: impl Into<String>,
        index: usize,
        kind: TurnKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            speaker_id: speaker.id.clone(),
            speaker_name: speaker.display_name.clone(),
            text: text.into(),
            timestamp,
            index,
            kind,
            is_question: false,
            answers_question: kind == TurnKind::Answer,
        }
    }

    pub fn with_question(mut self, is_question: bool) -> Self {
        self.is_question = is_question;
        self
    }

    /// `speaker: text`, the line format used in transcripts.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.speaker_name, self.text)
    }
}

/// Renders turns as a newline separated transcript.
pub fn transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(Turn::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}
