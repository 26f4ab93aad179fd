//! Error taxonomy for a prediction run.
//!
//! Every stage returns a [`PredictError`]. The run orchestration wraps it in a
//! [`RunError`] that remembers which stage failed, and the binary turns that
//! into a prefixed diagnostic and a non-zero exit status.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictError>;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("failed to load artifact {path}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("failed to read {path}: {reason}")]
    InputRead { path: PathBuf, reason: String },

    #[error("record {index}: {message}")]
    Schema { index: usize, message: String },

    #[error("record {index}: cannot parse timestamp {value:?}")]
    TimestampParse { index: usize, value: String },

    #[error(
        "Wrong coordinates: {count} record(s) outside the known locations, first at record {first_index} ({lat}, {lng})"
    )]
    UnknownLocation {
        count: usize,
        first_index: usize,
        lat: f64,
        lng: f64,
    },

    #[error("{table} lookup has no entry for {key} (artifacts are inconsistent)")]
    InconsistentLookup { table: &'static str, key: String },

    #[error("model {model} failed: {reason}")]
    Inference { model: String, reason: String },

    #[error("{records} records but {predictions} predictions")]
    RecordCountMismatch { records: usize, predictions: usize },

    #[error("failed to write {path}: {reason}")]
    OutputWrite { path: PathBuf, reason: String },

    #[error("invalid run transition {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

impl PredictError {
    pub fn artifact(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema(index: usize, message: impl Into<String>) -> Self {
        Self::Schema {
            index,
            message: message.into(),
        }
    }

    pub fn inference(model: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Inference {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

/// Stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Loading,
    Reading,
    Transforming,
    Predicting,
    Writing,
    Done,
    Failed,
}

impl Stage {
    /// Diagnostic prefix shown to the operator when this stage fails.
    pub fn prefix(self) -> &'static str {
        match self {
            Stage::Loading => "Unable to load models: ",
            Stage::Reading => "Error during opening input file: ",
            Stage::Transforming => "Wrong data provided: ",
            Stage::Predicting => "Error during prediction: ",
            Stage::Writing => "Error during saving output file: ",
            Stage::Done | Stage::Failed => "Run aborted: ",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Reading => "reading",
            Stage::Transforming => "transforming",
            Stage::Predicting => "predicting",
            Stage::Writing => "writing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A stage error as surfaced at the top-level boundary.
#[derive(Debug, Error)]
#[error("{}{}", .stage.prefix(), .source)]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub source: PredictError,
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_error_is_prefixed_with_stage() {
        let error = RunError {
            stage: Stage::Transforming,
            source: PredictError::UnknownLocation {
                count: 2,
                first_index: 0,
                lat: 41.0,
                lng: -87.0,
            },
        };
        let text = error.to_string();
        assert!(text.starts_with("Wrong data provided: Wrong coordinates"));
        assert!(text.contains("2 record(s)"));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Loading < Stage::Reading);
        assert!(Stage::Writing < Stage::Done);
    }
}
