//! Configuration management for the demand predictor

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Rounding applied to the model's continuous output
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Ties go to the even neighbour (2.5 -> 2, 3.5 -> 4), as the training pipeline rounds
    #[default]
    HalfEven,
    /// Ties go away from zero (2.5 -> 3, -2.5 -> -3)
    HalfAwayFromZero,
}

impl RoundingMode {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            RoundingMode::HalfEven => value.round_ties_even(),
            RoundingMode::HalfAwayFromZero => value.round(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

/// Layout of the artifact directory produced by training
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding the model and the lookup tables
    pub dir: PathBuf,
    /// Explicit model file name; detected (model.json, then model.onnx) when unset
    pub model: Option<String>,
    /// Coordinates -> location id
    pub locations: String,
    /// Location id -> community area id
    pub area: String,
    /// Half-hour boundary -> time bin id
    pub time: String,
    /// Intra-op threads for the ONNX backend
    pub onnx_threads: usize,
}

impl ArtifactsConfig {
    pub fn locations_path(&self) -> PathBuf {
        self.dir.join(&self.locations)
    }

    pub fn area_path(&self) -> PathBuf {
        self.dir.join(&self.area)
    }

    pub fn time_path(&self) -> PathBuf {
        self.dir.join(&self.time)
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            model: None,
            locations: "locations.json".to_string(),
            area: "area.json".to_string(),
            time: "time.json".to_string(),
            onnx_threads: 1,
        }
    }
}

/// Inference configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct InferenceConfig {
    pub rounding: RoundingMode,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load from `path` when given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::default()),
        }
    }
}
