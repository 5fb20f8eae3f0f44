//! Question detection.

use std::sync::Arc;

use crate::config::QuestionLexicon;
use crate::persona::Persona;

/// Result of inspecting a turn's text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionDetection {
    pub is_question: bool,
    /// Participant the question names, if any (never the asker).
    pub addressee: Option<String>,
}

/// Decides whether a text is a question and whom it addresses.
pub trait QuestionDetector: Send + Sync {
    fn is_question(&self, text: &str) -> bool;

    /// The participant named earliest in `text`, excluding the speaker.
    fn addressee(&self, text: &str, speaker_id: &str, participants: &[Arc<Persona>]) -> Option<String> {
        participants
            .iter()
            .filter(|p| p.id != speaker_id)
            .filter_map(|p| {
                p.mention_names()
                    .filter_map(|name| text.find(name))
                    .min()
                    .map(|pos| (pos, p))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, p)| p.id.clone())
    }

    fn detect(&self, text: &str, speaker_id: &str, participants: &[Arc<Persona>]) -> QuestionDetection {
        if !self.is_question(text) {
            return QuestionDetection::default();
        }
        QuestionDetection {
            is_question: true,
            addressee: self.addressee(text, speaker_id, participants),
        }
    }
}

/// Lexicon based detector: question marks anywhere, or a
/// question ending on the final sentence.
#[derive(Debug, Clone, Default)]
pub struct LexiconQuestionDetector {
    lexicon: QuestionLexicon,
}

impl LexiconQuestionDetector {
    pub fn new(lexicon: QuestionLexicon) -> Self {
        Self { lexicon }
    }
}

const TRAILING: &[char] = &['。', '！', '!', '…', '.', '．', '~', '～', 'ー', '♪'];

impl QuestionDetector for LexiconQuestionDetector {
    fn is_question(&self, text: &str) -> bool {
        if self
            .lexicon
            .markers
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
        {
            return true;
        }
        let tail = text.trim().trim_end_matches(|c: char| c.is_whitespace() || TRAILING.contains(&c));
        self.lexicon
            .endings
            .iter()
            .any(|ending| !ending.is_empty() && tail.ends_with(ending.as_str()))
    }
}
