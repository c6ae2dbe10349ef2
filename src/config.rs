use crate::error::ConfigError;
use crate::location::Coordinates;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_CAMERA_DISTANCE: f64 = 3.0;
pub const MAX_CAMERA_DISTANCE: f64 = 10.0;
/// Graticule spacing bounds in degrees. Lines are sampled every few degrees,
/// so finer spacing than that only multiplies the segment count.
pub const MIN_GRATICULE_STEP: f64 = 5.0;
pub const MAX_GRATICULE_STEP: f64 = 90.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub globe: GlobeConfig,
    pub broadcast: BroadcastConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
            poll_interval_secs: 4,
        }
    }
}

impl ApiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobeConfig {
    /// Auto-rotation speed in radians per second.
    pub rotation_speed: f64,
    pub camera_distance: f64,
    pub stars: usize,
    pub max_events: usize,
    /// Spacing of latitude/longitude grid lines in degrees.
    pub graticule_step: f64,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 0.03,
            camera_distance: 5.0,
            stars: 300,
            max_events: crate::store::MAX_EVENTS,
            graticule_step: 30.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BroadcastConfig {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Overrides the language detected from the locale.
    pub lang: Option<String>,
}

impl BroadcastConfig {
    pub fn location(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 50,
            log_file: None,
        }
    }
}

impl UiConfig {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/gaia/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gaia").join("config.toml"))
    }

    pub fn default_log_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("gaia")
            .join("gaia.log")
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// An explicitly given file must exist; a missing default file just means
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate()?;

        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "api.base_url",
                reason: format!("{:?} is not an http(s) URL", self.api.base_url),
            });
        }
        if self.api.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "api.poll_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(MIN_CAMERA_DISTANCE..=MAX_CAMERA_DISTANCE).contains(&self.globe.camera_distance) {
            return Err(ConfigError::Invalid {
                field: "globe.camera_distance",
                reason: format!(
                    "must be between {} and {}",
                    MIN_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE
                ),
            });
        }
        if self.globe.max_events == 0 {
            return Err(ConfigError::Invalid {
                field: "globe.max_events",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(MIN_GRATICULE_STEP..=MAX_GRATICULE_STEP).contains(&self.globe.graticule_step) {
            return Err(ConfigError::Invalid {
                field: "globe.graticule_step",
                reason: format!(
                    "must be between {} and {} degrees",
                    MIN_GRATICULE_STEP, MAX_GRATICULE_STEP
                ),
            });
        }
        if !self.globe.rotation_speed.is_finite() {
            return Err(ConfigError::Invalid {
                field: "globe.rotation_speed",
                reason: format!("{} is not a finite number", self.globe.rotation_speed),
            });
        }
        if let Some(coords) = self.broadcast.location() {
            if !coords.is_valid() {
                return Err(ConfigError::Invalid {
                    field: "broadcast.lat/lng",
                    reason: format!("{} is not a valid position", coords),
                });
            }
        }
        Ok(())
    }
}
