use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    geo::Coordinate, geolocation::check_max_uncertainty, model::Treasure, provider::ProviderId,
    treasure::ProximityThresholds,
};

/// Overrides the platform config file location.
pub const CONFIG_ENV: &str = "TREASURE_CONFIG";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Where the current position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    #[default]
    Device,
    Fixed,
    Ip,
}

/// Example TOML:
/// [location]
/// source = "fixed"
/// latitude = 59.91
/// longitude = 10.75
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSource,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Device fixes wider than this are rejected.
    pub max_uncertainty_m: Option<f64>,
}

impl LocationConfig {
    /// The fixed position, if both halves are set.
    pub fn fixed_coordinate(&self) -> Result<Option<Coordinate>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(anyhow!("[location] needs both `latitude` and `longitude`, or neither")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.fixed_coordinate()?;
        if let Some(max) = self.max_uncertainty_m {
            check_max_uncertainty(max)?;
        }
        Ok(())
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, e.g. "openweather" or "weatherapi".
    pub default_provider: Option<String>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub proximity: ProximityThresholds,

    /// Example TOML:
    /// [[treasures]]
    /// name = "old oak"
    /// latitude = 59.9
    /// longitude = 10.7
    #[serde(default)]
    pub treasures: Vec<Treasure>,
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let s = self.default_provider.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "No default provider configured.\n\
                 Hint: run `treasure configure <provider>` (e.g. `treasure configure openweather`) first."
            )
        })?;

        ProviderId::try_from(s.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from the platform path, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.proximity
            .validate()
            .with_context(|| format!("Invalid [proximity] in {}", path.display()))?;
        cfg.location
            .validate()
            .with_context(|| format!("Invalid [location] in {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Self::config_path_from(std::env::var_os(CONFIG_ENV))
    }

    /// Resolve the config path from the value of [`CONFIG_ENV`]. An empty value
    /// counts as unset.
    pub fn config_path_from(override_path: Option<OsString>) -> Result<PathBuf> {
        if let Some(path) = override_path.filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("dev", "treasure", "treasure-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Convenience helper: set/replace a provider API key and optionally set default provider.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// Add a treasure, replacing any existing one with the same name.
    /// Returns true if an existing treasure was replaced.
    pub fn add_treasure(&mut self, treasure: Treasure) -> bool {
        match self.treasures.iter_mut().find(|t| t.name == treasure.name) {
            Some(existing) => {
                *existing = treasure;
                true
            }
            None => {
                self.treasures.push(treasure);
                false
            }
        }
    }

    /// Remove a treasure by name. Returns false if no such treasure exists.
    pub fn remove_treasure(&mut self, name: &str) -> bool {
        let before = self.treasures.len();
        self.treasures.retain(|t| t.name != name);
        self.treasures.len() != before
    }

    pub fn treasure(&self, name: &str) -> Option<&Treasure> {
        self.treasures.iter().find(|t| t.name == name)
    }
}
