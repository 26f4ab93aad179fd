//! ONNX model backend (cargo feature `onnx`)

use super::Regressor;
use crate::types::{FeatureRow, FEATURE_NAMES};
use anyhow::{anyhow, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Loaded ONNX regressor
pub struct OnnxModel {
    /// Model name
    name: String,
    /// ONNX Runtime session; `run` needs exclusive access
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output name for predictions
    output_name: String,
}

impl OnnxModel {
    /// Load an ONNX model from file
    pub fn load(path: &Path, onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // skl2onnx regressors name their output "variable"
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("variable") || o.name.contains("output"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "variable".to_string());

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl Regressor for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let width = FEATURE_NAMES.len();
        let mut data = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            for (f, feature) in FEATURE_NAMES.iter().enumerate() {
                let value = row
                    .value(f)
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| anyhow!("row {i}: feature {feature} is not numeric"))?;
                data.push(value as f32);
            }
        }

        // Prepare input tensor - shape [rows, features]
        let shape = vec![rows.len() as i64, width as i64];
        let input_tensor =
            Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| anyhow!("model has no output named {}", self.output_name))?;
        let (_, values) = output.try_extract_tensor::<f32>()?;

        Ok(values.iter().map(|&v| f64::from(v)).collect())
    }
}
