//! Session configuration stored as JSON in `~/.gatorconfig.json`.
//!
//! The file records the database connection string and the name of the
//! logged-in user. A missing file yields `Config::default()`; the file is
//! only written by `login` and `register`.
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the config, relative to the home directory.
pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

/// File name of the default SQLite database, relative to the home directory.
pub const DEFAULT_DB_FILE_NAME: &str = ".gator.db";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("HOME environment variable not set")]
    NoHomeDir,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// sqlx connection string; empty means the default database file.
    pub db_url: String,

    /// Name of the logged-in user; empty when nobody has logged in.
    pub current_user_name: String,
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::NoHomeDir)
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// `$HOME/.gatorconfig.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(home_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Connection string for `$HOME/.gator.db`, created on first use.
    pub fn default_db_url() -> Result<String, ConfigError> {
        let path = home_dir()?.join(DEFAULT_DB_FILE_NAME);
        Ok(format!("sqlite://{}?mode=rwc", path.display()))
    }

    /// The configured connection string, or the default database when unset.
    pub fn resolved_db_url(&self) -> Result<String, ConfigError> {
        if self.db_url.trim().is_empty() {
            Self::default_db_url()
        } else {
            Ok(self.db_url.clone())
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty or whitespace-only file → `Ok(Config::default())`
    /// - Invalid JSON → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(serde_json::Value::Object(raw)) =
            serde_json::from_str::<serde_json::Value>(&content)
        {
            let known_keys = ["db_url", "current_user_name"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), user = %config.current_user_name, "Loaded configuration");
        Ok(config)
    }

    /// Write the configuration to `path`.
    ///
    /// The JSON is written to a sibling temp file, synced, then renamed over
    /// the target so a crash never leaves a truncated config behind.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');

        let suffix = uuid::Uuid::new_v4().simple();
        let temp_path = path.with_extension(format!("tmp.{}", suffix));
        let write_result = (|| -> std::io::Result<()> {
            // create_new refuses to follow a pre-planted symlink at the temp path
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(e) = write_result.and_then(|()| std::fs::rename(&temp_path, path)) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(ConfigError::Io(e));
        }

        tracing::debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Record `username` as the logged-in user and persist the change.
    ///
    /// The in-memory value only changes once the file write has succeeded.
    pub fn set_user(&mut self, path: &Path, username: &str) -> Result<(), ConfigError> {
        if username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }

        let updated = Config {
            current_user_name: username.to_string(),
            ..self.clone()
        };
        updated.save(path)?;
        *self = updated;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
