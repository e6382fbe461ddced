use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use crate::{
    provider::{ProviderId, outlook},
    reconcile::{EngineSettings, ReconcileSettings},
    units::UnitPreference,
};

/// Environment variable that overrides the stored one-call API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_STATION_FEED: &str = "https://services9.arcgis.com/RHVPKKiFTONKtxq3/arcgis/rest/services/NOAA_METAR_current_wind_speed_direction_v1/FeatureServer/0/query?where=1%3D1&outFields=*&f=geojson";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_seconds: u64,
    /// The government APIs reject requests without an identifying agent.
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: format!("wxsync/{} (weather reconciliation CLI)", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Clamped to 3..=5 seconds.
    pub delivery_timeout_seconds: u64,
    pub max_station_distance_km: f64,
    pub refresh_cooldown_seconds: u64,
    pub visibility_cap_miles: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_seconds: 4,
            max_station_distance_km: 15.0,
            refresh_cooldown_seconds: 30,
            visibility_cap_miles: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub station_feed: String,
    /// `{day}` is replaced by the outlook day (1-3).
    pub outlook_template: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            station_feed: DEFAULT_STATION_FEED.to_string(),
            outlook_template: outlook::DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [providers.onecall]
/// api_key = "..."
///
/// [units]
/// temperature = "celsius"
/// pressure = "hpa"
///
/// [engine]
/// max_station_distance_km = 20.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub providers: HashMap<String, ProviderConfig>,
    pub units: UnitPreference,
    pub network: NetworkConfig,
    pub engine: EngineConfig,
    pub endpoints: EndpointConfig,

    #[serde(skip)]
    env_api_key: Option<String>,
}

impl Config {
    /// Load config from disk (defaults when the file doesn't exist yet) and
    /// apply the environment key override.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_env_override(std::env::var(API_KEY_ENV).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed. The
    /// environment override is never written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

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
        let dirs = ProjectDirs::from("dev", "wxsync", "wxsync")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// A non-blank key here wins over the stored one for the one-call provider.
    pub fn with_env_override(mut self, key: Option<String>) -> Self {
        self.env_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        if provider_id == ProviderId::OneCall {
            if let Some(key) = self.env_api_key.as_deref() {
                return Some(key);
            }
        }
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            reconcile: ReconcileSettings {
                max_station_distance_km: self.engine.max_station_distance_km,
                visibility_cap_mi: self.engine.visibility_cap_miles,
            },
            delivery_timeout: Duration::from_secs(self.engine.delivery_timeout_seconds.clamp(3, 5)),
            refresh_cooldown: Duration::from_secs(self.engine.refresh_cooldown_seconds),
        }
    }
}
