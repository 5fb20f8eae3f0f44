//! Discord event handling.

use std::sync::Arc;

use chrono::Utc;
use kaiwa_application::{
    ChannelCoordinator, MentionTracker, ReplyResponder, UserReply, strip_mentions,
};
use kaiwa_core::persona::{Persona, PersonaRegistry};
use kaiwa_core::session::DestinationId;
use kaiwa_interaction::{DiscordWebhookDispatcher, Dispatcher};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serenity::all::{Context, CreateEmbed, CreateMessage, EventHandler, Message, Ready};
use serenity::async_trait;

const INFO_COLOUR: u32 = 0x00ff00;

/// Commands understood after the configured prefix.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    StartChat,
    SendAs { persona: &'a str, text: &'a str },
    ListPersonas,
    CharacterInfo { name: Option<&'a str> },
}

fn parse_command<'a>(prefix: &str, content: &'a str) -> Option<Command<'a>> {
    let rest = content.trim().strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    match name {
        "ai_chat" | "ai会話" => Some(Command::StartChat),
        "ai_characters" => Some(Command::ListPersonas),
        "ai_character_info" => Some(Command::CharacterInfo {
            name: (!args.is_empty()).then_some(args),
        }),
        "send_as" => {
            let (persona, text) = args.split_once(char::is_whitespace)?;
            let text = text.trim();
            (!text.is_empty()).then_some(Command::SendAs { persona, text })
        }
        _ => None,
    }
}

/// Embed fields describing a persona.
fn character_fields(persona: &Persona) -> [(&'static str, String); 2] {
    [
        ("話し方", persona.speaking_style.clone()),
        ("興味", persona.interests.join("、")),
    ]
}

pub struct Handler {
    coordinator: Arc<ChannelCoordinator>,
    dispatcher: Arc<DiscordWebhookDispatcher>,
    responder: Arc<ReplyResponder>,
    mentions: Arc<MentionTracker>,
    registry: Arc<PersonaRegistry>,
    /// Channel where mentions get a persona response
    interaction_channel: Option<DestinationId>,
    prefix: String,
}

impl Handler {
    pub fn new(
        coordinator: Arc<ChannelCoordinator>,
        dispatcher: Arc<DiscordWebhookDispatcher>,
        responder: Arc<ReplyResponder>,
        mentions: Arc<MentionTracker>,
        interaction_channel: Option<DestinationId>,
        prefix: String,
    ) -> Self {
        Self {
            registry: coordinator.registry().clone(),
            coordinator,
            dispatcher,
            responder,
            mentions,
            interaction_channel,
            prefix,
        }
    }

    async fn say(&self, ctx: &Context, msg: &Message, text: impl Into<String>) {
        if let Err(e) = msg.channel_id.say(ctx, text).await {
            tracing::warn!(channel = %msg.channel_id, error = %e, "Failed to send message");
        }
    }

    async fn start_chat(&self, ctx: &Context, msg: &Message) {
        let destination = DestinationId(msg.channel_id.get());
        if self.coordinator.is_busy(destination) {
            self.say(ctx, msg, "既に会話が進行中です。").await;
            return;
        }
        self.say(ctx, msg, "AIキャラクターたちの会話を始めます！").await;

        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            if let Err(e) = coordinator.start_random_session(destination, &mut rng).await {
                tracing::warn!(%destination, error = %e, "Manual conversation not started");
            }
        });
    }

    async fn send_as(&self, ctx: &Context, msg: &Message, persona: &str, text: &str) {
        let Some(persona) = self.registry.find_by_name(persona) else {
            self.say(ctx, msg, format!("キャラクター「{persona}」が見つかりません。")).await;
            return;
        };
        let destination = DestinationId(msg.channel_id.get());
        if let Err(e) = self
            .dispatcher
            .present_as(destination, &persona.identity(), text)
            .await
        {
            tracing::warn!(%destination, error = %e, "send_as failed");
            self.say(ctx, msg, "メッセージを送信できませんでした。").await;
        }
    }

    async fn list_personas(&self, ctx: &Context, msg: &Message) {
        let mut lines = vec!["**AIキャラクター一覧**".to_string()];
        for persona in self.registry.list_active() {
            lines.push(format!(
                "- **{}** ({}): {}",
                persona.display_name, persona.id, persona.personality
            ));
        }
        self.say(ctx, msg, lines.join("\n")).await;
    }

    async fn character_info(&self, ctx: &Context, msg: &Message, name: Option<&str>) {
        let Some(name) = name else {
            let names: Vec<_> = self
                .registry
                .list_active()
                .iter()
                .map(|p| p.name.clone())
                .collect();
            self.say(
                ctx,
                msg,
                format!("キャラクター名を指定してください。利用可能: {}", names.join(", ")),
            )
            .await;
            return;
        };
        let Some(persona) = self.registry.find_by_name(name) else {
            self.say(ctx, msg, format!("キャラクター「{name}」が見つかりません。")).await;
            return;
        };

        let embed = character_fields(&persona).into_iter().fold(
            CreateEmbed::new()
                .title(format!("🤖 {}", persona.display_name))
                .description(persona.personality.as_str())
                .colour(INFO_COLOUR),
            |embed, (field, value)| embed.field(field, value, false),
        );
        if let Err(e) = msg
            .channel_id
            .send_message(ctx, CreateMessage::new().embed(embed))
            .await
        {
            tracing::warn!(channel = %msg.channel_id, error = %e, "Failed to send character info");
        }
    }

    /// A user mentioned the bot in the interaction channel.
    fn answer_mention(&self, ctx: &Context, msg: &Message) -> bool {
        let destination = DestinationId(msg.channel_id.get());
        if !self.mentions.is_enabled() || self.interaction_channel != Some(destination) {
            return false;
        }
        let me = ctx.cache.current_user().id;
        if !msg.mentions_user_id(me) {
            return false;
        }
        let Some(persona) =
            self.mentions
                .pick_responder(destination, Utc::now(), &mut StdRng::from_entropy())
        else {
            tracing::debug!(%destination, "Mention exchange is over, staying quiet");
            return false;
        };

        let responder = self.responder.clone();
        let mentions = self.mentions.clone();
        let user_name = msg.author.name.clone();
        let text = msg.content.clone();
        tokio::spawn(async move {
            if responder
                .respond_to_mention(&persona, destination, &user_name, &text)
                .await
                .is_some()
            {
                mentions.record_response(destination, Utc::now(), &mut StdRng::from_entropy());
            }
        });
        true
    }

    /// A user replied to a message a persona posted through its webhook.
    async fn answer_reply(&self, msg: &Message) -> bool {
        let Some(referenced) = msg.referenced_message.as_deref() else {
            return false;
        };
        let Some(webhook_id) = referenced.webhook_id else {
            return false;
        };
        let destination = DestinationId(msg.channel_id.get());
        let Some(persona) = self
            .dispatcher
            .persona_for_webhook(destination, webhook_id)
            .await
            .and_then(|id| self.registry.get(&id))
        else {
            return false;
        };

        self.mentions.record_reply(destination, &persona, Utc::now());

        let responder = self.responder.clone();
        let user_name = msg.author.name.clone();
        let text = msg.content.clone();
        let original = strip_mentions(&referenced.content);
        tokio::spawn(async move {
            let reply = UserReply {
                destination,
                user_name: &user_name,
                text: &text,
                original: (!original.is_empty()).then_some(original.as_str()),
            };
            responder.respond(&persona, reply).await;
        });
        true
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(
            user = %ready.user.name,
            personas = self.registry.len(),
            "Connected to Discord"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.webhook_id.is_some() {
            return;
        }

        match parse_command(&self.prefix, &msg.content) {
            Some(Command::StartChat) => self.start_chat(&ctx, &msg).await,
            Some(Command::SendAs { persona, text }) => {
                self.send_as(&ctx, &msg, persona, text).await
            }
            Some(Command::ListPersonas) => self.list_personas(&ctx, &msg).await,
            Some(Command::CharacterInfo { name }) => self.character_info(&ctx, &msg, name).await,
            None if msg.content.starts_with(&self.prefix) || msg.content.starts_with('/') => {}
            None => {
                if self.answer_reply(&msg).await {
                    tracing::debug!(channel = %msg.channel_id, user = %msg.author.name, "Reply routed to persona");
                } else if self.answer_mention(&ctx, &msg) {
                    tracing::debug!(channel = %msg.channel_id, user = %msg.author.name, "Mention answered by persona");
                }
            }
        }
    }
}
