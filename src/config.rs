//! Client configuration.
//!
//! The original client scattered `API_BASE` constants across components;
//! everything here is consolidated into one struct handed to the session
//! controller and backend client at construction time.

use std::env;
use std::path::PathBuf;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL, no trailing slash
    pub api_base: String,
    /// Directory for the durable token store
    pub storage_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `FORTUNE_API_BASE` defaults to the production backend;
    /// `FORTUNE_STORAGE_DIR` defaults to `~/.fortune-ki`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base = env::var("FORTUNE_API_BASE")
            .unwrap_or_else(|_| "https://fortuneki.site".to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let storage_dir = match env::var("FORTUNE_STORAGE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_storage_dir().ok_or(ConfigError::Missing("FORTUNE_STORAGE_DIR"))?,
        };

        Ok(Self {
            api_base,
            storage_dir,
        })
    }
}

/// Scoped per-install storage, the native analog of the browser profile
/// that held the original's localStorage.
fn default_storage_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".fortune-ki"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
