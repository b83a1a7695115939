use std::collections::BTreeMap;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::correlate::{OnUnknownSatellite, PipelineSettings, SatelliteCatalog};
use crate::predict::PassCriteria;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Satellite names used in detections, mapped to catalog numbers.
    pub satellites: BTreeMap<String, u32>,
    pub min_elevation_deg: f64,
    pub horizon_deg: f64,
    #[serde(deserialize_with = "deserialize_duration")]
    pub window_half_width: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub element_margin: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub offset_warning: Duration,
    pub on_unknown_satellite: OnUnknownSatellite,
    pub ground_altitude_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        let satellites = [("N", 37849), ("Terra", 25994), ("Aqua", 27424)]
            .into_iter()
            .map(|(name, id)| (name.to_string(), id))
            .collect();
        Self {
            satellites,
            min_elevation_deg: 20.0,
            horizon_deg: 0.0,
            window_half_width: Duration::hours(24),
            element_margin: Duration::hours(12),
            offset_warning: Duration::minutes(10),
            on_unknown_satellite: OnUnknownSatellite::Abort,
            ground_altitude_m: 0.0,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.into()));
        if !(-90.0..=90.0).contains(&self.min_elevation_deg) {
            return invalid("min_elevation_deg must be within [-90, 90]");
        }
        if !(-90.0..=90.0).contains(&self.horizon_deg) {
            return invalid("horizon_deg must be within [-90, 90]");
        }
        if self.window_half_width <= Duration::zero() {
            return invalid("window_half_width must be positive");
        }
        if self.element_margin < Duration::zero() {
            return invalid("element_margin must not be negative");
        }
        if self.offset_warning < Duration::zero() {
            return invalid("offset_warning must not be negative");
        }
        Ok(())
    }

    pub fn catalog(&self) -> SatelliteCatalog {
        SatelliteCatalog::new(self.satellites.clone())
    }

    pub fn pipeline_settings(&self, limit: Option<usize>) -> PipelineSettings {
        PipelineSettings {
            element_margin: self.element_margin,
            window_half_width: self.window_half_width,
            criteria: PassCriteria {
                horizon_deg: self.horizon_deg,
                min_elevation_deg: self.min_elevation_deg,
            },
            offset_warning: self.offset_warning,
            ground_altitude_m: self.ground_altitude_m,
            on_unknown_satellite: self.on_unknown_satellite,
            limit,
        }
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}
