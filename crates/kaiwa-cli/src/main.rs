use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod bot;
mod commands;
mod logging;
mod runtime;

#[derive(Parser)]
#[command(name = "kaiwa")]
#[command(about = "kaiwa - multi-persona conversations for Discord channels", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/kaiwa/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write daily rolling log files to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and run the bot with its scheduler
    Run,
    /// Run a single conversation
    Chat {
        /// Channel to post in (defaults to the configured channel)
        #[arg(long)]
        channel: Option<u64>,
        /// Conversation topic (random when omitted)
        #[arg(long)]
        topic: Option<String>,
        /// Participant id or name; repeat for each (random when omitted)
        #[arg(long = "persona")]
        personas: Vec<String>,
        /// Print turns to the terminal instead of posting them
        #[arg(long)]
        dry_run: bool,
        /// Seed for reproducible speaker and length choices
        #[arg(long)]
        seed: Option<u64>,
        /// Print the session report as JSON when done
        #[arg(long)]
        json: bool,
    },
    /// List the available personas
    Personas,
    /// Post a message as a persona
    SendAs {
        /// Persona id or name
        persona: String,
        /// Message text
        text: String,
        #[arg(long)]
        channel: Option<u64>,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Show,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => kaiwa_infrastructure::KaiwaPaths::config_file()?,
    };

    let config = runtime::load_config(&config_path)?;
    let log_dir = match (cli.log_dir, config.logging.directory.clone()) {
        (Some(dir), _) | (None, Some(dir)) => Some(dir),
        // `run` logs to disk unless told otherwise
        (None, None) if matches!(cli.command, Commands::Run) => {
            Some(kaiwa_infrastructure::KaiwaPaths::logs_dir()?)
        }
        (None, None) => None,
    };
    let _log_guard = logging::init(log_dir.as_deref())?;

    match cli.command {
        Commands::Run => commands::run::execute(config, &config_path).await?,
        Commands::Chat {
            channel,
            topic,
            personas,
            dry_run,
            seed,
            json,
        } => {
            commands::chat::execute(
                config,
                &config_path,
                commands::chat::ChatOptions {
                    channel,
                    topic,
                    personas,
                    dry_run,
                    seed,
                    json,
                },
            )
            .await?
        }
        Commands::Personas => commands::personas::list(&config_path).await?,
        Commands::SendAs {
            persona,
            text,
            channel,
        } => commands::send_as::execute(config, &config_path, &persona, &text, channel).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config)?,
            ConfigAction::Path => println!("{}", config_path.display()),
        },
    }

    Ok(())
}
