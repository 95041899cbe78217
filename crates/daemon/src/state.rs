//! Application state for docverify config directories
//!
//! Handles creating and loading the config directory (`~/.docverify` or a
//! custom path) shared by the daemon and the CLI.

use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use common::content_store::ContentStoreConfig;
use common::fingerprint::FingerprintScheme;
use common::ledger::LedgerConfig;

pub const APP_NAME: &str = "docverify";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Clear of a local kubo node's API (5001) and gateway (8080).
pub const DEFAULT_API_PORT: u16 = 8090;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Configuration stored in config.toml. Never holds secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// How documents are fingerprinted before registration
    #[serde(default)]
    pub fingerprint_scheme: FingerprintScheme,
    /// Timeout for every upstream HTTP request (content store and RPC)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub content_store: ContentStoreConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            fingerprint_scheme: FingerprintScheme::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            content_store: ContentStoreConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

/// A docverify config directory
#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the config directory (~/.docverify or custom)
    pub docverify_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the config directory path (custom or default ~/.docverify)
    pub fn docverify_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new config directory
    pub fn init(custom_path: Option<PathBuf>, config: Option<AppConfig>) -> Result<Self, StateError> {
        let docverify_dir = Self::docverify_dir(custom_path)?;

        if docverify_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&docverify_dir)?;

        let config = config.unwrap_or_default();
        let config_path = docverify_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            docverify_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the config directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let docverify_dir = Self::docverify_dir(custom_path)?;

        if !docverify_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = docverify_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            docverify_dir,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("docverify directory not initialized. Run 'docverify init' first or use --config-path")]
    NotInitialized,

    #[error("docverify directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
