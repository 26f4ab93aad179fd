//! Demand model loading and inference

pub mod inference;
pub mod loader;
pub mod native;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use inference::InferenceEngine;
pub use loader::{ArtifactLoader, Artifacts};
pub use native::NativeModel;

use crate::types::FeatureRow;

/// A pre-trained estimator: one continuous output per feature row, same order.
pub trait Regressor: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Raw predictions for `rows`
    fn predict(&self, rows: &[FeatureRow]) -> anyhow::Result<Vec<f64>>;
}
