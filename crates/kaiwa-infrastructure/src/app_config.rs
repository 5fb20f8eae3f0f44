//! Application configuration.
//!
//! Loaded from `~/.config/kaiwa/config.toml` (or an explicit path). A missing
//! file yields the defaults. Secrets left out of the file are taken from the
//! environment after `.env` has been read.

use std::path::{Path, PathBuf};

use kaiwa_core::config::ChatConfig;
use kaiwa_core::error::{KaiwaError, Result};
use kaiwa_core::persona::Persona;
use serde::{Deserialize, Serialize};

pub const ENV_DISCORD_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_CHANNEL_ID: &str = "AI_CHAT_CHANNEL_ID";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

const REDACTED: &str = "********";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub generator: GeneratorConfig,
    pub chat: ChatConfig,
    pub schedule: ScheduleConfig,
    pub interaction: InteractionConfig,
    pub logging: LoggingConfig,
    /// Persona catalogue; the presets are used when empty.
    #[serde(rename = "persona", skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<Persona>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Channel used by the scheduler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_channel_id: Option<u64>,
    pub command_prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            target_channel_id: None,
            command_prefix: "!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    #[default]
    Gemini,
    OpenAi,
}

impl GeneratorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL (Gemini) or chat-completions URL (OpenAI-compatible)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Gemini,
            model: None,
            api_key: None,
            endpoint: None,
            timeout_secs: 30,
            max_output_tokens: None,
        }
    }
}

/// Spontaneous conversation schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Local hours (0-23) at which a conversation may start
    pub hours: Vec<u32>,
    pub poll_interval_minutes: u64,
    /// A session this close (same day) blocks a new one
    pub proximity_hours: u32,
    /// Any session earlier the same day blocks a new one
    pub once_per_day: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hours: vec![13],
            poll_interval_minutes: 60,
            proximity_hours: 2,
            once_per_day: false,
        }
    }
}

/// Persona responses to users who mention the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub enabled: bool,
    /// Mention responses per exchange before the personas fall silent
    pub max_responses: usize,
    /// Quiet period after which an exchange starts over
    pub timeout_minutes: i64,
    /// Responses after which the exchange may end early
    pub end_after: usize,
    pub end_probability: f64,
    pub min_participants: usize,
    pub max_participants: usize,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_responses: 3,
            timeout_minutes: 30,
            end_after: 2,
            end_probability: 0.5,
            min_participants: 1,
            max_participants: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Loads the configuration file and fills secrets from the environment.
    ///
    /// A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "Loaded configuration file");
            config
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            AppConfig::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Fills unset secrets and ids from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.discord.token.is_none() {
            self.discord.token = lookup(ENV_DISCORD_TOKEN).filter(|v| !v.trim().is_empty());
        }
        if self.discord.target_channel_id.is_none() {
            self.discord.target_channel_id = lookup(ENV_CHANNEL_ID).and_then(|v| {
                v.trim()
                    .parse()
                    .map_err(|_| tracing::warn!(value = %v, "Ignoring non-numeric AI_CHAT_CHANNEL_ID"))
                    .ok()
            });
        }
        if self.generator.api_key.is_none() {
            let key = match self.generator.backend {
                GeneratorBackend::Gemini => ENV_GEMINI_API_KEY,
                GeneratorBackend::OpenAi => ENV_OPENAI_API_KEY,
            };
            self.generator.api_key = lookup(key).filter(|v| !v.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.chat.validate()?;
        if let Some(hour) = self.schedule.hours.iter().find(|h| **h > 23) {
            return Err(KaiwaError::config(format!(
                "schedule.hours: {hour} is not an hour of the day"
            )));
        }
        if self.schedule.poll_interval_minutes == 0 {
            return Err(KaiwaError::config(
                "schedule.poll_interval_minutes must be at least 1",
            ));
        }
        let interaction = &self.interaction;
        if !(0.0..=1.0).contains(&interaction.end_probability) {
            return Err(KaiwaError::config(
                "interaction.end_probability must be within 0.0..=1.0",
            ));
        }
        if interaction.min_participants == 0 || interaction.min_participants > interaction.max_participants {
            return Err(KaiwaError::config(format!(
                "interaction participants: {}..={} is not a valid range",
                interaction.min_participants, interaction.max_participants
            )));
        }
        if interaction.timeout_minutes <= 0 {
            return Err(KaiwaError::config("interaction.timeout_minutes must be at least 1"));
        }
        if self.generator.timeout_secs == 0 {
            return Err(KaiwaError::config("generator.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// A copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.discord.token.is_some() {
            copy.discord.token = Some(REDACTED.to_string());
        }
        if copy.generator.api_key.is_some() {
            copy.generator.api_key = Some(REDACTED.to_string());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
