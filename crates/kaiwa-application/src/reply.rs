//! Persona answers to user replies.

use std::sync::Arc;

use kaiwa_core::config::TrimConfig;
use kaiwa_core::dialogue::trim_reply;
use kaiwa_core::persona::Persona;
use kaiwa_core::session::DestinationId;
use kaiwa_interaction::{Dispatcher, PromptBuilder, PromptError, ResponseGenerator};
use once_cell::sync::Lazy;
use regex::Regex;

static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@!?\d+>").expect("valid mention pattern"));

/// Removes user mentions (`<@123>` / `<@!123>`) and surrounding whitespace.
pub fn strip_mentions(text: &str) -> String {
    MENTION.replace_all(text, "").trim().to_string()
}

/// A user message that replied to something a persona said.
#[derive(Debug, Clone)]
pub struct UserReply<'a> {
    pub destination: DestinationId,
    pub user_name: &'a str,
    pub text: &'a str,
    /// What the persona said, when the referenced message is available.
    pub original: Option<&'a str>,
}

pub struct ReplyResponder {
    generator: Arc<dyn ResponseGenerator>,
    dispatcher: Arc<dyn Dispatcher>,
    prompts: PromptBuilder,
    trim: TrimConfig,
    min_chars: usize,
}

impl ReplyResponder {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        dispatcher: Arc<dyn Dispatcher>,
        prompts: PromptBuilder,
        trim: TrimConfig,
    ) -> Self {
        Self {
            generator,
            dispatcher,
            prompts,
            trim,
            min_chars: 1,
        }
    }

    /// Shortest sentence cut accepted when a reply is trimmed.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Lets `persona` answer once. Returns the presented text, or `None` if
    /// nothing usable came back.
    pub async fn respond(&self, persona: &Persona, reply: UserReply<'_>) -> Option<String> {
        let user_text = strip_mentions(reply.text);
        if user_text.is_empty() {
            return None;
        }
        let prompt = self
            .prompts
            .reply(&persona.traits(), reply.original, reply.user_name, &user_text);
        self.deliver(persona, reply.destination, reply.user_name, prompt)
            .await
    }

    /// Lets `persona` answer a user who mentioned the bot.
    pub async fn respond_to_mention(
        &self,
        persona: &Persona,
        destination: DestinationId,
        user_name: &str,
        text: &str,
    ) -> Option<String> {
        let user_text = strip_mentions(text);
        if user_text.is_empty() {
            return None;
        }
        let prompt = self.prompts.mention(&persona.traits(), user_name, &user_text);
        self.deliver(persona, destination, user_name, prompt).await
    }

    async fn deliver(
        &self,
        persona: &Persona,
        destination: DestinationId,
        user_name: &str,
        prompt: Result<String, PromptError>,
    ) -> Option<String> {
        let prompt = match prompt {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!(persona = %persona.id, error = %e, "Failed to render reply prompt");
                return None;
            }
        };

        let generated = match self.generator.generate(&persona.traits(), &prompt, "").await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(persona = %persona.id, error = %e, "Reply generation failed");
                return None;
            }
        };
        if generated.trim().is_empty() {
            tracing::warn!(persona = %persona.id, "Empty reply, nothing sent");
            return None;
        }

        let text = trim_reply(&generated, &self.trim, self.min_chars).into_text();
        if let Err(e) = self
            .dispatcher
            .present_as(destination, &persona.identity(), &text)
            .await
        {
            tracing::warn!(persona = %persona.id, error = %e, "Failed to present reply");
            return None;
        }
        tracing::info!(
            persona = %persona.id,
            %destination,
            user = user_name,
            "Persona replied to user"
        );
        Some(text)
    }
}
