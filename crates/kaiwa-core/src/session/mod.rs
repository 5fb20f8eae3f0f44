//! Session domain module.
//!
//! This module contains the conversation session model, the turn record and
//! the in-memory history store.
//!
//! # Module Structure
//!
//! - `model`: Session lifecycle model (`ConversationSession`, `SessionState`, `EndReason`)
//! - `turn`: Recorded utterances (`Turn`, `TurnKind`)
//! - `history`: Per-session, append-only turn storage (`ConversationHistoryStore`)
//!
//! # Usage
//!
//! ```ignore
//! use kaiwa_core::session::{ConversationSession, ConversationHistoryStore, Turn, TurnKind};
//! ```

mod history;
mod model;
mod turn;

// Re-export public API
pub use history::ConversationHistoryStore;
pub use model::{ConversationSession, DestinationId, EndReason, SessionState};
pub use turn::{Turn, TurnKind, transcript};
