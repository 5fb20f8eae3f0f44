//! Unified path management for kaiwa configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/kaiwa/             # Config directory
//! ├── config.toml              # Application configuration and persona catalogue
//! └── logs/                    # Application logs
//!     └── kaiwa.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

use kaiwa_core::error::{KaiwaError, Result};

const APP_DIR: &str = "kaiwa";

pub struct KaiwaPaths;

impl KaiwaPaths {
    /// Returns the kaiwa configuration directory (e.g. `~/.config/kaiwa/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| KaiwaError::config("Cannot find config directory"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the default directory for rolling log files.
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file() {
        let Ok(config_dir) = KaiwaPaths::config_dir() else {
            return;
        };
        assert!(config_dir.ends_with("kaiwa"));
        let config_file = KaiwaPaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        assert!(config_file.starts_with(&config_dir));
    }

    #[test]
    fn test_logs_dir() {
        let Ok(logs_dir) = KaiwaPaths::logs_dir() else {
            return;
        };
        assert!(logs_dir.ends_with("logs"));
    }
}
