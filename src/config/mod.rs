// Configuration management for Rayyfy
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::audio::QualityTag;

pub const DEFAULT_CATALOG_URL: &str = "https://spotify-ivory-one.vercel.app";
pub const CATALOG_URL_ENV: &str = "RAYYFY_CATALOG_URL";
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub download_directory: PathBuf,
    pub catalog: CatalogConfig,
    pub audio: AudioSettings,
    pub ui: UiConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub search_limit: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// 0.0..=1.0
    pub volume: f32,
    pub default_quality: QualityTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub search_debounce_ms: u64,
    pub seek_step_secs: u64,
    pub volume_step: f32,
    pub tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.to_string(),
            search_limit: 20,
            timeout_secs: 30,
            user_agent: format!("Rayyfy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            default_quality: QualityTag::highest(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            seek_step_secs: 10,
            volume_step: 0.1,
            tick_ms: 100,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_directory: dirs::download_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            catalog: CatalogConfig::default(),
            audio: AudioSettings::default(),
            ui: UiConfig::default(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run, then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_or_create(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            let config = Config::default();
            // a read-only config dir is not worth failing startup over
            if let Err(e) = config.save_to(config_path) {
                warn!("Could not write default config to {}: {:#}", config_path.display(), e);
            } else {
                info!("Wrote default config to {}", config_path.display());
            }
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.audio.volume = config.audio.volume.clamp(0.0, 1.0);
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("rayyfy");

        Ok(config_dir.join("config.toml"))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `RAYYFY_CATALOG_URL` and `PORT` as looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(CATALOG_URL_ENV).filter(|u| !u.trim().is_empty()) {
            debug!("Catalog URL overridden from {}", CATALOG_URL_ENV);
            self.catalog.base_url = url.trim().to_string();
        }

        if let Some(port) = lookup(PORT_ENV) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.proxy.port = port,
                Err(_) => warn!("Ignoring invalid {}={:?}", PORT_ENV, port),
            }
        }
    }
}
