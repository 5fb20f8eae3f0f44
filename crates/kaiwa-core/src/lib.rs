pub mod config;
pub mod dialogue;
pub mod error;
pub mod persona;
pub mod session;

// Re-export common error type
pub use error::{KaiwaError, Result};
