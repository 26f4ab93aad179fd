//! End-to-end run: load artifacts, read, transform, predict, write.
//!
//! A run walks `Loading -> Reading -> Transforming -> Predicting -> Writing
//! -> Done` exactly once. Any stage error moves it to `Failed` and is returned
//! tagged with the stage, so the caller can report it and exit.

use crate::config::AppConfig;
use crate::error::{PredictError, RunError, Stage};
use crate::feature_extractor::FeatureExtractor;
use crate::input::read_requests;
use crate::metrics::RunMetrics;
use crate::models::{ArtifactLoader, InferenceEngine};
use crate::output::{merge, write_output};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Linear run state machine
#[derive(Debug)]
pub struct RunState {
    stage: Stage,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Loading,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `to`; only the next stage in order, or `Failed` from any unfinished stage.
    pub fn advance(&mut self, to: Stage) -> Result<(), PredictError> {
        let allowed = match (self.stage, to) {
            (Stage::Done | Stage::Failed, _) => false,
            (_, Stage::Failed) => true,
            (Stage::Loading, Stage::Reading)
            | (Stage::Reading, Stage::Transforming)
            | (Stage::Transforming, Stage::Predicting)
            | (Stage::Predicting, Stage::Writing)
            | (Stage::Writing, Stage::Done) => true,
            _ => false,
        };
        if !allowed {
            return Err(PredictError::InvalidTransition {
                from: self.stage,
                to,
            });
        }
        debug!(from = %self.stage, to = %to, "Run transition");
        self.stage = to;
        Ok(())
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct RunSummary {
    pub records: usize,
    pub output: PathBuf,
    pub metrics: RunMetrics,
}

struct Run {
    state: RunState,
    metrics: RunMetrics,
}

impl Run {
    /// Execute `work` as `stage`, then advance to `next`.
    fn stage<T>(
        &mut self,
        stage: Stage,
        next: Stage,
        work: impl FnOnce() -> Result<T, PredictError>,
    ) -> Result<T, RunError> {
        if self.state.stage() != stage {
            let source = PredictError::InvalidTransition {
                from: self.state.stage(),
                to: stage,
            };
            return Err(self.fail(stage, source));
        }

        let started = Instant::now();
        let value = work().map_err(|source| self.fail(stage, source))?;
        self.metrics.record_stage(stage, started.elapsed());

        self.state
            .advance(next)
            .map_err(|source| self.fail(stage, source))?;
        Ok(value)
    }

    fn fail(&mut self, stage: Stage, source: PredictError) -> RunError {
        // already terminal states stay as they are
        let _ = self.state.advance(Stage::Failed);
        RunError { stage, source }
    }
}

/// Run the whole batch from `input` to `output`.
pub fn run(config: &AppConfig, input: &Path, output: &Path) -> Result<RunSummary, RunError> {
    let mut run = Run {
        state: RunState::new(),
        metrics: RunMetrics::new(),
    };

    let artifacts = run.stage(Stage::Loading, Stage::Reading, || {
        ArtifactLoader::new(&config.artifacts).load()
    })?;

    let requests = run.stage(Stage::Reading, Stage::Transforming, || read_requests(input))?;

    let extractor = FeatureExtractor::new(&artifacts.lookups);
    info!(
        records = requests.len(),
        features = extractor.feature_count(),
        names = ?extractor.feature_names(),
        "Extracting features"
    );
    let rows = run.stage(Stage::Transforming, Stage::Predicting, || {
        extractor.extract(&requests)
    })?;

    let engine = InferenceEngine::new(artifacts.model, config.inference.rounding);
    let demand = run.stage(Stage::Predicting, Stage::Writing, || engine.predict(&rows))?;
    run.metrics.record_predictions(&demand);
    info!(model = %engine.model_name(), predictions = demand.len(), "Predictions ready");

    let records = requests.len();
    run.stage(Stage::Writing, Stage::Done, || {
        let merged = merge(requests, &demand)?;
        write_output(output, &merged)
    })?;

    info!(records, output = %output.display(), "Run complete");
    Ok(RunSummary {
        records,
        output: output.to_path_buf(),
        metrics: run.metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_transitions() {
        let mut state = RunState::new();
        for next in [
            Stage::Reading,
            Stage::Transforming,
            Stage::Predicting,
            Stage::Writing,
            Stage::Done,
        ] {
            state.advance(next).unwrap();
        }
        assert_eq!(state.stage(), Stage::Done);
        assert!(state.advance(Stage::Failed).is_err());
    }

    #[test]
    fn test_no_skipping_or_reentry() {
        let mut state = RunState::new();
        assert!(state.advance(Stage::Predicting).is_err());
        state.advance(Stage::Reading).unwrap();
        assert!(state.advance(Stage::Loading).is_err());
        assert!(state.advance(Stage::Reading).is_err());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut state = RunState::new();
        state.advance(Stage::Reading).unwrap();
        state.advance(Stage::Failed).unwrap();
        assert!(state.advance(Stage::Transforming).is_err());
        assert!(state.advance(Stage::Failed).is_err());
    }

    #[test]
    fn test_missing_artifacts_fail_in_loading() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.artifacts.dir = dir.path().join("models");

        let err = run(
            &config,
            &dir.path().join("input.json"),
            &dir.path().join("output.json"),
        )
        .unwrap_err();
        assert_eq!(err.stage, Stage::Loading);
        assert!(err.to_string().starts_with("Unable to load models: "));
    }
}
