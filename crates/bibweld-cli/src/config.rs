//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for bibweld
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite file holding cached HTTP responses
    pub path: PathBuf,
    /// Days a cached response stays fresh
    pub max_age_days: u32,
    /// Retries per failing request
    pub max_retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("http_cache.db"),
            max_age_days: 30,
            max_retries: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// SQLite file for the relational mirror
    pub path: PathBuf,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("mirror.db"),
        }
    }
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "bibweld")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load from ./bibweld.toml, then the platform config dir, then
    /// defaults.
    pub fn load() -> Result<Config> {
        let local = Path::new("bibweld.toml");
        if local.exists() {
            return Config::from_file(local);
        }
        if let Some(dirs) = directories::ProjectDirs::from("", "", "bibweld") {
            let path = dirs.config_dir().join("config.toml");
            if path.exists() {
                return Config::from_file(&path);
            }
        }
        Ok(Config::default())
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}
