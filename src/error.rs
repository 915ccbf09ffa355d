//! Custom error types for convmem

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for convmem operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Export file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for convmem
pub type Result<T> = std::result::Result<T, Error>;
