use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const STORAGE_HOST_ENV: &str = "TICKETVIEW_STORAGE_HOST";
pub const MASTER_KEY_ENV: &str = "TICKETVIEW_MASTER_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Storage API base URL (default: https://api.jsonbin.io)
    #[serde(default = "default_storage_host")]
    pub storage_host: String,

    /// Access key sent when a viewer link carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key: Option<String>,

    /// Largest single asset the inliner will embed
    #[serde(default = "default_max_asset_bytes")]
    pub max_asset_bytes: u64,
}

fn default_storage_host() -> String {
    "https://api.jsonbin.io".to_string()
}

fn default_max_asset_bytes() -> u64 {
    8 * 1024 * 1024
}

fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set")?;
    Ok(PathBuf::from(home).join(".ticketview").join("config.toml"))
}

impl Config {
    /// Load config from ~/.ticketview/config.toml, returning defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Layer TICKETVIEW_* environment variables over the file values
    pub fn apply_env(&mut self) {
        if let Some(host) = env_value(STORAGE_HOST_ENV) {
            self.storage_host = host;
        }
        if let Some(key) = env_value(MASTER_KEY_ENV) {
            self.master_key = Some(key);
        }
    }

    /// Save config to ~/.ticketview/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "storage_host" | "host" => {
                let value = value.trim().trim_end_matches('/');
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    bail!("invalid storage_host: must start with http:// or https://");
                }
                self.storage_host = value.to_string();
            }
            "master_key" | "key" => {
                self.master_key = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            "max_asset_bytes" => {
                let bytes: u64 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid max_asset_bytes: must be a number"))?;
                if bytes == 0 {
                    bail!("invalid max_asset_bytes: must be greater than 0");
                }
                self.max_asset_bytes = bytes;
            }
            _ => bail!("unknown config key: {key}"),
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_host: default_storage_host(),
            master_key: None,
            max_asset_bytes: default_max_asset_bytes(),
        }
    }
}
