//! Persona domain model.
//!
//! Represents the synthetic characters that take turns in a conversation.
//! Each persona has a fixed personality, speaking style and interests.

use serde::{Deserialize, Serialize};

/// A named synthetic participant with fixed traits.
///
/// Personas are loaded once into the registry and shared behind `Arc`;
/// sessions only ever read them.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    /// Stable identifier (e.g. `ai_takahashi`)
    pub id: String,
    /// Name used inside prompts
    pub name: String,
    /// Name shown on the chat surface
    pub display_name: String,
    /// Extra strings that count as addressing this persona (e.g. a family name)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Avatar image shown next to the persona's messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Personality description
    pub personality: String,
    /// Speaking style description
    pub speaking_style: String,
    /// Interests, most important first
    #[serde(default)]
    pub interests: Vec<String>,
    /// Whether the persona can be picked for new conversations
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Persona {
    /// Every string that identifies this persona in free text.
    pub fn mention_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(std::iter::once(self.display_name.as_str()))
            .chain(self.aliases.iter().map(String::as_str))
            .filter(|name| !name.trim().is_empty())
    }

    /// Returns true if `text` mentions this persona by name, display name or alias.
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        self.mention_names().any(|name| text.contains(name))
    }

    /// The traits handed to a response generator.
    pub fn traits(&self) -> PersonaTraits {
        PersonaTraits {
            name: self.name.clone(),
            personality: self.personality.clone(),
            speaking_style: self.speaking_style.clone(),
            interests: self.interests.clone(),
        }
    }

    /// The identity a dispatcher presents messages under.
    pub fn identity(&self) -> PersonaIdentity {
        PersonaIdentity {
            persona_id: self.id.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Persona traits consumed by a response generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaTraits {
    pub name: String,
    pub personality: String,
    pub speaking_style: String,
    pub interests: Vec<String>,
}

impl PersonaTraits {
    /// The leading interests, joined with the Japanese list separator.
    pub fn top_interests(&self, n: usize) -> String {
        self.interests
            .iter()
            .take(n)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("、")
    }
}

/// Identity used when presenting a message as a persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaIdentity {
    pub persona_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
