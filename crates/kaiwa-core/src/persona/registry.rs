//! Read-only persona registry.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use super::model::Persona;
use super::repository::PersonaRepository;
use crate::error::{KaiwaError, Result};

/// Holds the persona catalogue for the lifetime of the process.
///
/// Personas keep their catalogue order; lookups by id go through an index.
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: Vec<Arc<Persona>>,
    index: HashMap<String, usize>,
}

impl PersonaRegistry {
    /// Builds a registry from a list of personas.
    ///
    /// Later duplicates of an id are ignored.
    pub fn new(personas: Vec<Persona>) -> Self {
        let mut registry = Self::default();
        for persona in personas {
            if registry.index.contains_key(&persona.id) {
                tracing::warn!(persona_id = %persona.id, "Duplicate persona id ignored");
                continue;
            }
            registry
                .index
                .insert(persona.id.clone(), registry.personas.len());
            registry.personas.push(Arc::new(persona));
        }
        registry
    }

    /// Loads the catalogue from a repository.
    pub async fn load(repository: &dyn PersonaRepository) -> Result<Self> {
        let personas = repository.get_all().await?;
        tracing::debug!(count = personas.len(), "Loaded persona catalogue");
        Ok(Self::new(personas))
    }

    pub fn get(&self, id: &str) -> Option<Arc<Persona>> {
        self.index.get(id).map(|&i| Arc::clone(&self.personas[i]))
    }

    /// All personas, active or not.
    pub fn all(&self) -> &[Arc<Persona>] {
        &self.personas
    }

    pub fn list_active(&self) -> Vec<Arc<Persona>> {
        self.personas
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect()
    }

    /// Picks `k` distinct active personas, uniformly without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<Arc<Persona>>> {
        let active = self.list_active();
        if k > active.len() {
            return Err(KaiwaError::insufficient_participants(k, active.len()));
        }
        Ok(active.choose_multiple(rng, k).cloned().collect())
    }

    /// Resolves a free-form name to an active persona.
    ///
    /// Exact match on id, name or display name wins; otherwise the first
    /// persona whose name contains the query (or is contained in it), ignoring case.
    pub fn find_by_name(&self, query: &str) -> Option<Arc<Persona>> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        let lowered = query.to_lowercase();

        let active = || self.personas.iter().filter(|p| p.active);
        if let Some(exact) = active().find(|p| {
            p.id == query || p.name.to_lowercase() == lowered || p.display_name.to_lowercase() == lowered
        }) {
            return Some(Arc::clone(exact));
        }

        active()
            .find(|p| {
                p.mention_names().any(|name| {
                    let name = name.to_lowercase();
                    name.contains(&lowered) || lowered.contains(&name)
                })
            })
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
