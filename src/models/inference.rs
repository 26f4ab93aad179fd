//! Inference engine: runs the model over a batch and rounds to integer demand

use super::Regressor;
use crate::config::RoundingMode;
use crate::error::{PredictError, Result};
use crate::types::FeatureRow;
use tracing::{debug, info};

/// Round a raw prediction; `None` for values that have no integer demand.
pub fn round_prediction(value: f64, mode: RoundingMode) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = mode.apply(value);
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if rounded >= -(2f64.powi(63)) && rounded < 2f64.powi(63) {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Batch inference over a single pre-trained regressor
pub struct InferenceEngine {
    model: Box<dyn Regressor>,
    rounding: RoundingMode,
}

impl InferenceEngine {
    pub fn new(model: Box<dyn Regressor>, rounding: RoundingMode) -> Self {
        info!(model = %model.name(), rounding = ?rounding, "Inference engine initialized");
        Self { model, rounding }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Predict integer demand for every row, in row order.
    ///
    /// The model is called once for the whole batch. Any model failure, a
    /// wrong number of outputs or an output that cannot be rounded to an
    /// integer fails the batch.
    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let name = self.model.name();
        let raw = self
            .model
            .predict(rows)
            .map_err(|e| PredictError::inference(name, format!("{e:#}")))?;

        if raw.len() != rows.len() {
            return Err(PredictError::inference(
                name,
                format!("returned {} predictions for {} rows", raw.len(), rows.len()),
            ));
        }

        let demand = raw
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                round_prediction(value, self.rounding).ok_or_else(|| {
                    PredictError::inference(
                        name,
                        format!("row {i}: prediction {value} is not a finite integer-range value"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(model = %name, rows = rows.len(), "Batch inference complete");
        Ok(demand)
    }
}
