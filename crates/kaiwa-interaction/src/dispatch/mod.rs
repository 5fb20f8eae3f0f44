//! Presenting text as a persona.
//!
//! # Module Structure
//!
//! - `discord`: Channel webhooks with a plain-message fallback (`DiscordWebhookDispatcher`)
//! - `console`: Standard output, for dry runs (`ConsoleDispatcher`)

mod console;
mod discord;

use async_trait::async_trait;
use kaiwa_core::persona::PersonaIdentity;
use kaiwa_core::session::DestinationId;
use thiserror::Error;

pub use console::ConsoleDispatcher;
pub use discord::{DiscordWebhookDispatcher, WEBHOOK_NAME_PREFIX, persona_id_from_webhook_name, webhook_name};

/// How a message ended up being presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Shown under the persona's own name and avatar.
    AsPersona,
    /// Shown as a plain message prefixed with the persona's name.
    Fallback,
}

#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("Failed to send to channel {destination}: {message}")]
    Send {
        destination: DestinationId,
        message: String,
    },
}

/// Presents text in a destination under a persona's identity.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn present_as(
        &self,
        destination: DestinationId,
        identity: &PersonaIdentity,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError>;
}

/// The plain-message form used when a persona identity cannot be shown.
pub fn fallback_text(identity: &PersonaIdentity, text: &str) -> String {
    format!("**{}**: {}", identity.display_name, text)
}
