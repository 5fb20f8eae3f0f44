//! TOML-based PersonaRepository implementation

use std::path::PathBuf;

use kaiwa_core::error::Result;
use kaiwa_core::persona::{Persona, PersonaRepository, get_default_presets};
use serde::Deserialize;

use crate::paths::KaiwaPaths;

#[derive(Deserialize, Default)]
struct PersonaFile {
    #[serde(rename = "persona", default)]
    personas: Vec<Persona>,
}

/// Reads the `[[persona]]` tables of the config file.
///
/// Falls back to the preset catalogue when the file is missing or declares
/// no personas.
pub struct TomlPersonaRepository {
    path: PathBuf,
}

impl TomlPersonaRepository {
    /// Creates a repository for the default config path (~/.config/kaiwa/config.toml)
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: KaiwaPaths::config_file()?,
        })
    }

    /// Creates a repository with a custom config path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl PersonaRepository for TomlPersonaRepository {
    async fn get_all(&self) -> Result<Vec<Persona>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No persona file, using presets");
                return Ok(get_default_presets());
            }
            Err(err) => return Err(err.into()),
        };

        let file: PersonaFile = toml::from_str(&content)?;
        if file.personas.is_empty() {
            return Ok(get_default_presets());
        }
        Ok(file.personas)
    }
}
