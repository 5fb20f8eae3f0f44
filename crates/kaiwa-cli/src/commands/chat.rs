use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use kaiwa_application::{SessionReport, TopicCatalogue};
use kaiwa_core::config::PacingConfig;
use kaiwa_core::session::DestinationId;
use kaiwa_infrastructure::AppConfig;
use kaiwa_interaction::{ConsoleDispatcher, DiscordWebhookDispatcher, Dispatcher};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::runtime;

/// Channel id shown for dry runs without a configured channel.
const DRY_RUN_DESTINATION: u64 = 0;

pub struct ChatOptions {
    pub channel: Option<u64>,
    pub topic: Option<String>,
    pub personas: Vec<String>,
    pub dry_run: bool,
    pub seed: Option<u64>,
    pub json: bool,
}

pub async fn execute(mut config: AppConfig, config_path: &Path, options: ChatOptions) -> Result<()> {
    let registry = runtime::load_registry(config_path).await?;
    let generator = runtime::generator(&config)?;

    let (dispatcher, destination): (Arc<dyn Dispatcher>, DestinationId) = if options.dry_run {
        config.chat.pacing = PacingConfig::none();
        let destination = options
            .channel
            .or(config.discord.target_channel_id)
            .unwrap_or(DRY_RUN_DESTINATION);
        (Arc::new(ConsoleDispatcher), DestinationId(destination))
    } else {
        let token = runtime::discord_token(&config)?;
        (
            Arc::new(DiscordWebhookDispatcher::from_token(token)),
            runtime::destination(options.channel, &config)?,
        )
    };

    let orchestrator =
        runtime::orchestrator(generator, dispatcher, config.chat.clone(), options.seed)?;
    let coordinator = runtime::coordinator(orchestrator, registry.clone());

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = if options.personas.is_empty() && options.topic.is_none() {
        coordinator.start_random_session(destination, &mut rng).await?
    } else {
        let participants = if options.personas.is_empty() {
            let range = config.chat.participants;
            registry.sample(range.min, &mut rng)?
        } else {
            options
                .personas
                .iter()
                .map(|query| runtime::find_persona(&registry, query))
                .collect::<Result<Vec<_>>>()?
        };
        let topic = match options.topic {
            Some(topic) => topic,
            None => TopicCatalogue::default()
                .pick(&participants, &mut rng)
                .context("No topic available")?,
        };
        coordinator
            .start_session(destination, participants, topic)
            .await?
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &SessionReport) {
    println!();
    println!("💬 {}", report.topic);
    println!("   participants: {}", report.participants.join(", "));
    println!(
        "   {} turns, {} skipped, {}",
        report.turns.len(),
        report.skipped_turns,
        report.end_reason
    );
}
