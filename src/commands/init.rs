//! Init command implementation

use crate::config::{Config, PathsConfig};
use crate::db::MemoryDb;
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub config_path: PathBuf,
    /// Database location to record instead of the default
    pub db_file: Option<PathBuf>,
    pub force: bool,
}

/// Where init wrote things
#[derive(Debug, Clone, Serialize)]
pub struct InitSummary {
    pub config_path: String,
    pub db_path: String,
    pub claude_export: String,
    pub chatgpt_export: String,
}

/// Write a default configuration and create the database schema
pub async fn cmd_init(options: InitOptions) -> Result<InitSummary> {
    let InitOptions {
        config_path,
        db_file,
        force,
    } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.paths = PathsConfig {
        config_file: config_path.clone(),
    };
    if let Some(db_file) = db_file {
        config.database.file = db_file;
    }
    config.validate()?;
    config.save()?;

    let db = MemoryDb::open(&config.database.file).await?;
    db.close().await;
    info!("Created database at {:?}", config.database.file);

    Ok(InitSummary {
        config_path: config_path.display().to_string(),
        db_path: config.database.file.display().to_string(),
        claude_export: config.import.claude_export.display().to_string(),
        chatgpt_export: config.import.chatgpt_export.display().to_string(),
    })
}

/// Print init summary to console
pub fn print_init_summary(summary: &InitSummary) {
    println!("✓ convmem initialized successfully");
    println!("  Config: {}", summary.config_path);
    println!("  Database: {}", summary.db_path);
    println!("\nNext steps:");
    println!("  1. Place your Claude export at {}", summary.claude_export);
    println!("  2. Place your ChatGPT export at {}", summary.chatgpt_export);
    println!("  3. Import: convmem import");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_config_and_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        let options = InitOptions {
            config_path: config_path.clone(),
            db_file: Some(tmp.path().join("memory.db")),
            force: false,
        };

        let summary = cmd_init(options.clone()).await.unwrap();

        assert!(config_path.exists());
        assert!(tmp.path().join("memory.db").exists());
        assert_eq!(summary.config_path, config_path.display().to_string());

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.database.file, tmp.path().join("memory.db"));

        assert!(matches!(cmd_init(options).await, Err(Error::Config(_))));
    }
}
