//! Error types for kaiwa.

use thiserror::Error;

/// A shared error type for the whole workspace.
///
/// Only the "cannot start" family ever reaches the caller of a conversation;
/// everything that happens inside a running turn loop is logged and folded
/// into the session report instead.
#[derive(Error, Debug, Clone)]
pub enum KaiwaError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A conversation needs at least `required` distinct personas.
    #[error("Insufficient participants: {provided} provided, at least {required} required")]
    InsufficientParticipants { required: usize, provided: usize },

    /// Another turn loop already owns this destination.
    #[error("A conversation is already in progress in channel {destination}")]
    SessionInProgress { destination: u64 },

    /// A turn was rejected by a session or history invariant.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KaiwaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an InsufficientParticipants error
    pub fn insufficient_participants(required: usize, provided: usize) -> Self {
        Self::InsufficientParticipants { required, provided }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Invariant error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error means the conversation never started.
    pub fn is_refused_start(&self) -> bool {
        matches!(
            self,
            Self::InsufficientParticipants { .. } | Self::SessionInProgress { .. }
        )
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for KaiwaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for KaiwaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for KaiwaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for KaiwaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, KaiwaError>`.
pub type Result<T> = std::result::Result<T, KaiwaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_start_covers_both_start_errors() {
        assert!(KaiwaError::insufficient_participants(2, 1).is_refused_start());
        assert!(KaiwaError::SessionInProgress { destination: 7 }.is_refused_start());
        assert!(!KaiwaError::config("bad").is_refused_start());
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err: KaiwaError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml").into();
        match err {
            KaiwaError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
