//! Wiring shared by the commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use kaiwa_application::{ChannelCoordinator, ReplyResponder, TurnOrchestrator};
use kaiwa_core::config::ChatConfig;
use kaiwa_core::persona::{Persona, PersonaRegistry};
use kaiwa_core::session::{ConversationHistoryStore, DestinationId};
use kaiwa_infrastructure::{AppConfig, TomlPersonaRepository};
use kaiwa_interaction::{Dispatcher, PromptBuilder, ResponseGenerator, build_generator};

pub fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

pub async fn load_registry(config_path: &Path) -> Result<Arc<PersonaRegistry>> {
    let repository = TomlPersonaRepository::with_path(config_path.to_path_buf());
    let registry = PersonaRegistry::load(&repository)
        .await
        .context("Failed to load personas")?;
    tracing::debug!(count = registry.len(), "Personas loaded");
    Ok(Arc::new(registry))
}

pub fn generator(config: &AppConfig) -> Result<Arc<dyn ResponseGenerator>> {
    build_generator(&config.generator).context("Failed to set up the response generator")
}

pub fn destination(explicit: Option<u64>, config: &AppConfig) -> Result<DestinationId> {
    explicit
        .or(config.discord.target_channel_id)
        .map(DestinationId)
        .context("No channel given; pass --channel or set AI_CHAT_CHANNEL_ID")
}

pub fn discord_token(config: &AppConfig) -> Result<&str> {
    config
        .discord
        .token
        .as_deref()
        .context("Discord token not found; set DISCORD_BOT_TOKEN or [discord].token")
}

/// Resolves a persona by id or name.
pub fn find_persona(registry: &PersonaRegistry, query: &str) -> Result<Arc<Persona>> {
    registry
        .find_by_name(query)
        .with_context(|| format!("Unknown persona '{query}'"))
}

pub fn orchestrator(
    generator: Arc<dyn ResponseGenerator>,
    dispatcher: Arc<dyn Dispatcher>,
    chat: ChatConfig,
    seed: Option<u64>,
) -> Result<Arc<TurnOrchestrator>> {
    let orchestrator = TurnOrchestrator::new(
        generator,
        dispatcher,
        Arc::new(ConversationHistoryStore::new()),
        chat,
    )
    .context("Failed to set up the conversation loop")?;
    Ok(Arc::new(match seed {
        Some(seed) => orchestrator.with_seed(seed),
        None => orchestrator,
    }))
}

pub fn coordinator(
    orchestrator: Arc<TurnOrchestrator>,
    registry: Arc<PersonaRegistry>,
) -> Arc<ChannelCoordinator> {
    Arc::new(ChannelCoordinator::new(orchestrator, registry))
}

pub fn responder(
    generator: Arc<dyn ResponseGenerator>,
    dispatcher: Arc<dyn Dispatcher>,
    config: &AppConfig,
) -> Result<ReplyResponder> {
    let prompts = PromptBuilder::new().context("Failed to compile prompt templates")?;
    Ok(ReplyResponder::new(
        generator,
        dispatcher,
        prompts,
        config.chat.trim.clone(),
    )
    .with_min_chars(config.chat.min_reply_chars))
}
