//! Persona repository trait.
//!
//! Defines the interface for loading the persona catalogue.

use super::model::Persona;
use crate::error::Result;

/// An abstract source of personas.
///
/// Decouples the registry from the storage mechanism (TOML file, presets,
/// remote API).
#[async_trait::async_trait]
pub trait PersonaRepository: Send + Sync {
    /// Retrieves all personas from storage.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Persona>)`: All stored personas, active or not
    /// - `Err(KaiwaError)`: Error if retrieval fails
    async fn get_all(&self) -> Result<Vec<Persona>>;
}

/// Repository serving the built-in preset catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct PresetPersonaRepository;

#[async_trait::async_trait]
impl PersonaRepository for PresetPersonaRepository {
    async fn get_all(&self) -> Result<Vec<Persona>> {
        Ok(super::preset::get_default_presets())
    }
}
