//! Server configuration
//!
//! Defaults, then an optional TOML file, then `BOXSHELF_*` environment
//! overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Invalid config in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub listen_addr: String,
    /// SQLite database file, or `:memory:`
    pub database_path: PathBuf,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Bearer token to user subject id
    pub tokens: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3333".to_string(),
            database_path: default_database_path(),
            log_filter: "info".to_string(),
            log_json: false,
            tokens: HashMap::new(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("boxshelf")
        .join("boxshelf.db")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

impl ServerConfig {
    /// Load from `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("BOXSHELF_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(db) = var("BOXSHELF_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(json) = var("BOXSHELF_LOG_JSON").as_deref().and_then(parse_bool) {
            self.log_json = json;
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}
