pub mod app_config;
pub mod paths;
pub mod toml_persona_repository;

pub use app_config::{
    AppConfig, DiscordConfig, GeneratorBackend, GeneratorConfig, InteractionConfig, LoggingConfig,
    ScheduleConfig,
};
pub use paths::KaiwaPaths;
pub use toml_persona_repository::TomlPersonaRepository;
