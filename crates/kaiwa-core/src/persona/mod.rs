//! Persona domain module.
//!
//! This module contains the persona model, the preset catalogue, the
//! repository interface and the read-only registry sessions draw from.
//!
//! # Module Structure
//!
//! - `model`: Core persona domain models (`Persona`, `PersonaTraits`, `PersonaIdentity`)
//! - `repository`: Repository trait for loading the catalogue
//! - `preset`: Default personas
//! - `registry`: Lookup and sampling over the active catalogue
//!
//! # Usage
//!
//! ```ignore
//! use kaiwa_core::persona::{Persona, PersonaRegistry, get_default_presets};
//! ```

mod model;
mod preset;
mod registry;
mod repository;

// Re-export public API
pub use model::{Persona, PersonaIdentity, PersonaTraits};
pub use preset::{KING_DYNAKA_ID, YAMADA_MENTOR_ID, get_default_presets};
pub use registry::PersonaRegistry;
pub use repository::{PersonaRepository, PresetPersonaRepository};
