use std::path::Path;

use anyhow::{Context, Result};
use kaiwa_infrastructure::AppConfig;
use kaiwa_interaction::{DiscordWebhookDispatcher, DispatchOutcome, Dispatcher};

use crate::runtime;

pub async fn execute(
    config: AppConfig,
    config_path: &Path,
    persona: &str,
    text: &str,
    channel: Option<u64>,
) -> Result<()> {
    let registry = runtime::load_registry(config_path).await?;
    let persona = runtime::find_persona(&registry, persona)?;
    let destination = runtime::destination(channel, &config)?;
    let dispatcher = DiscordWebhookDispatcher::from_token(runtime::discord_token(&config)?);

    let outcome = dispatcher
        .present_as(destination, &persona.identity(), text)
        .await
        .context("Failed to post the message")?;

    match outcome {
        DispatchOutcome::AsPersona => println!("✅ Sent as {}", persona.display_name),
        DispatchOutcome::Fallback => println!(
            "⚠️  Sent as a plain message for {} (webhook unavailable)",
            persona.display_name
        ),
    }
    Ok(())
}
