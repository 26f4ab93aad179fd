//! Artifact loader: the model plus the three lookup tables

use super::{NativeModel, Regressor};
use crate::config::ArtifactsConfig;
use crate::error::{PredictError, Result};
use crate::lookups::{AreaLookup, LocationLookup, Lookups, TimeBinLookup};
use std::path::PathBuf;
use tracing::info;

/// Everything a run needs from the training step
pub struct Artifacts {
    pub model: Box<dyn Regressor>,
    pub lookups: Lookups,
}

/// Loader for the artifact directory
pub struct ArtifactLoader<'a> {
    config: &'a ArtifactsConfig,
}

impl<'a> ArtifactLoader<'a> {
    pub fn new(config: &'a ArtifactsConfig) -> Self {
        Self { config }
    }

    /// Load the model and all lookup tables, failing on the first bad file
    pub fn load(&self) -> Result<Artifacts> {
        let dir = &self.config.dir;
        if !dir.is_dir() {
            return Err(PredictError::artifact(dir, "artifact directory not found"));
        }
        info!(dir = %dir.display(), "Loading artifacts");

        let model = self.load_model()?;
        let lookups = Lookups::new(
            LocationLookup::load(&self.config.locations_path())?,
            AreaLookup::load(&self.config.area_path())?,
            TimeBinLookup::load(&self.config.time_path())?,
        );
        lookups.report_coverage();

        Ok(Artifacts { model, lookups })
    }

    /// Load the model file, detecting its format from the extension
    pub fn load_model(&self) -> Result<Box<dyn Regressor>> {
        let path = self.model_path()?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Box::new(NativeModel::load(&path)?)),
            Some("onnx") => self.load_onnx(path),
            _ => Err(PredictError::artifact(
                &path,
                "unsupported model format, expected .json or .onnx",
            )),
        }
    }

    /// Configured model file, or the first of model.json / model.onnx that exists
    pub fn model_path(&self) -> Result<PathBuf> {
        if let Some(name) = &self.config.model {
            return Ok(self.config.dir.join(name));
        }
        ["model.json", "model.onnx"]
            .iter()
            .map(|name| self.config.dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                PredictError::artifact(&self.config.dir, "no model.json or model.onnx found")
            })
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, path: PathBuf) -> Result<Box<dyn Regressor>> {
        let model = super::onnx::OnnxModel::load(&path, self.config.onnx_threads)
            .map_err(|e| PredictError::artifact(&path, format!("{e:#}")))?;
        Ok(Box::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, path: PathBuf) -> Result<Box<dyn Regressor>> {
        Err(PredictError::artifact(
            path,
            "ONNX models need the `onnx` feature enabled at build time",
        ))
    }
}
