use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use kaiwa_application::{MentionTracker, SpontaneousChatScheduler};
use kaiwa_core::session::DestinationId;
use kaiwa_infrastructure::AppConfig;
use kaiwa_interaction::DiscordWebhookDispatcher;
use serenity::all::{Client, GatewayIntents};
use tokio_util::sync::CancellationToken;

use crate::bot::Handler;
use crate::runtime;

pub async fn execute(config: AppConfig, config_path: &Path) -> Result<()> {
    let token = runtime::discord_token(&config)?.to_string();
    let registry = runtime::load_registry(config_path).await?;
    let generator = runtime::generator(&config)?;
    let dispatcher = Arc::new(DiscordWebhookDispatcher::from_token(&token));

    let orchestrator =
        runtime::orchestrator(generator.clone(), dispatcher.clone(), config.chat.clone(), None)?;
    let coordinator = runtime::coordinator(orchestrator, registry.clone());
    let mentions = Arc::new(MentionTracker::new(config.interaction.clone(), registry));
    let responder = Arc::new(runtime::responder(generator, dispatcher.clone(), &config)?);

    let shutdown = CancellationToken::new();
    match config.discord.target_channel_id {
        Some(channel) => {
            let scheduler = SpontaneousChatScheduler::new(
                coordinator.clone(),
                DestinationId(channel),
                config.schedule.clone(),
            );
            tokio::spawn(scheduler.run(shutdown.child_token()));
        }
        None => tracing::warn!("AI_CHAT_CHANNEL_ID not set, spontaneous conversations disabled"),
    }

    let handler = Handler::new(
        coordinator,
        dispatcher,
        responder,
        mentions,
        config.discord.target_channel_id.map(DestinationId),
        config.discord.command_prefix.clone(),
    );
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_WEBHOOKS
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
        }
        signal.cancel();
        shard_manager.shutdown_all().await;
    });

    tracing::info!("Starting Discord client");
    let result = client.start().await.context("Discord client stopped with an error");
    shutdown.cancel();
    result
}
