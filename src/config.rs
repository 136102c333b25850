use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::matcher::DEFAULT_THRESHOLD;

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_threshold")]
    pub threshold: f32,
    #[serde(default = "SearchConfig::default_limit")]
    pub limit: usize,
    #[serde(default = "SearchConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl SearchConfig {
    fn default_threshold() -> f32 {
        DEFAULT_THRESHOLD
    }

    fn default_limit() -> usize {
        20
    }

    fn default_debounce_ms() -> u64 {
        300
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            limit: 20,
            debounce_ms: 300,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct AnalyticsConfig {
    /// Optional cap on the analytics log; unset preserves the historical
    /// unbounded behavior.
    pub max_entries: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TranscriptsConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub transcripts: TranscriptsConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join("pip-search");

        let config_path = config_dir.join("config.yaml");

        let config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&config_content)?
        } else {
            // Create default config if it doesn't exist
            fs::create_dir_all(&config_dir)?;
            let default_config = Self::default();
            let config_content = serde_yaml::to_string(&default_config)?;
            fs::write(&config_path, config_content)?;
            default_config
        };

        Ok(config)
    }

    pub fn get_data_dir(&self) -> Result<PathBuf> {
        if let Some(data_dir) = &self.storage.data_dir {
            return Ok(data_dir.clone());
        }

        let base = dirs::data_dir().ok_or_else(|| anyhow!("Could not find data directory"))?;
        Ok(base.join("pip-search"))
    }

    pub fn get_transcripts_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.transcripts.dir {
            return Ok(dir.clone());
        }

        Ok(self.get_data_dir()?.join("transcripts"))
    }
}

// Global config instance
use once_cell::sync::OnceCell;
static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load().unwrap_or_default())
}
