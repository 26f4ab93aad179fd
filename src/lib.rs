//! Ride Demand Predictor Library
//!
//! One-shot batch inference: ride requests in, the same requests annotated
//! with predicted demand out. Features are derived from lookup tables
//! produced by the offline training step.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod input;
pub mod lookups;
pub mod metrics;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod types;

pub use config::AppConfig;
pub use error::{PredictError, RunError, Stage};
pub use feature_extractor::FeatureExtractor;
pub use lookups::Lookups;
pub use models::inference::InferenceEngine;
pub use pipeline::{run, RunSummary};
pub use types::{Category, FeatureRow, RideRequest};
