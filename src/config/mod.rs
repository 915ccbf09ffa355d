//! Configuration management for convmem
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Every path the importer touches comes from here, so the core never
//! depends on a fixed filesystem layout.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Export file locations
    #[serde(default)]
    pub import: ImportConfig,

    /// Database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reporting configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Knowledge-graph service
    #[serde(default)]
    pub graph: GraphConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Export file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Claude export (`conversations.json` with `mapping` trees)
    #[serde(default = "default_claude_export")]
    pub claude_export: PathBuf,

    /// ChatGPT export (`conversations.json` with `chat_messages` lists)
    #[serde(default = "default_chatgpt_export")]
    pub chatgpt_export: PathBuf,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_file")]
    pub file: PathBuf,
}

/// Reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of search results
    #[serde(default = "default_query_limit")]
    pub default_limit: usize,

    /// Content snippet length for search hits
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Title length in the recent conversations listing
    #[serde(default = "default_title_chars")]
    pub title_chars: usize,

    /// How many recent conversations the stats view lists
    #[serde(default = "default_recent_conversations")]
    pub recent_conversations: usize,
}

/// Knowledge-graph service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Base URL of the memory graph HTTP API
    #[serde(default = "default_graph_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_graph_timeout_secs")]
    pub timeout_secs: u64,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            claude_export: default_claude_export(),
            chatgpt_export: default_chatgpt_export(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file: default_db_file(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: default_graph_url(),
            timeout_secs: default_graph_timeout_secs(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_query_limit(),
            snippet_chars: default_snippet_chars(),
            title_chars: default_title_chars(),
            recent_conversations: default_recent_conversations(),
        }
    }
}

impl Config {
    /// Get the default base directory for convmem (~/.convmem)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".convmem")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    /// when no config file exists there
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.query.default_limit == 0 {
            return Err(Error::Config(
                "query.default_limit must be greater than 0".to_string(),
            ));
        }

        if self.query.snippet_chars == 0 {
            return Err(Error::Config(
                "query.snippet_chars must be greater than 0".to_string(),
            ));
        }

        if self.query.title_chars == 0 {
            return Err(Error::Config(
                "query.title_chars must be greater than 0".to_string(),
            ));
        }

        if self.database.file.as_os_str().is_empty() {
            return Err(Error::Config("database.file must not be empty".to_string()));
        }

        if let Err(e) = url::Url::parse(&self.graph.url) {
            return Err(Error::Config(format!(
                "graph.url {:?} is not a valid URL: {}",
                self.graph.url, e
            )));
        }

        if self.graph.timeout_secs == 0 {
            return Err(Error::Config(
                "graph.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
