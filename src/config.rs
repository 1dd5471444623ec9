//! Global configuration for pagefinder

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default database file
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Default schema.yaml
    #[serde(default)]
    pub schema: Option<PathBuf>,

    /// Attach the selector to each query as an SQL comment
    #[serde(default)]
    pub debug: bool,

    /// Log filter used when RUST_LOG is unset, e.g. "info" or "pagefinder=debug"
    #[serde(default)]
    pub log_level: Option<String>,

    /// Default limit for `pf find` when the selector has none
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl Config {
    /// Load config from the default location (~/.config/pagefinder/config.toml)
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Get default config file path
    /// Checks ~/.config/pagefinder/config.toml first (XDG style),
    /// then falls back to OS-specific location
    pub fn default_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("pagefinder").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagefinder")
            .join("config.toml")
    }

    /// Database path: explicit flag, then config, then `./pages.db`
    pub fn database_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.database.clone())
            .unwrap_or_else(|| PathBuf::from("pages.db"))
    }

    /// Schema path: explicit flag, then config, then `./schema.yaml`
    pub fn schema_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.schema.clone())
            .unwrap_or_else(|| PathBuf::from("schema.yaml"))
    }

    /// Create default config file if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::default_path();

        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let default_config = r#"# pagefinder configuration

# Database file (defaults to ./pages.db)
# database = "/path/to/pages.db"

# Field schema (defaults to ./schema.yaml)
# schema = "/path/to/schema.yaml"

# Add the selector to each query as an SQL comment
# debug = false

# Log filter when RUST_LOG is unset
# log_level = "warn"

# Default page size for `pf find`
# page_size = 25
"#;

        std::fs::write(&config_path, default_config)?;

        Ok(config_path)
    }
}
