//! Run statistics: stage timings and the distribution of predicted demand.

use crate::error::Stage;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::info;

/// Summary of predicted demand values
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionStats {
    pub count: usize,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

/// Metrics collected over one run
#[derive(Debug)]
pub struct RunMetrics {
    /// Wall time per completed stage, in execution order
    stage_times: Vec<(Stage, Duration)>,
    /// Number of predicted records
    records: usize,
    /// Count of records per demand value
    demand_counts: BTreeMap<i64, u64>,
    /// Sum of demand, for the mean
    demand_sum: i128,
    start_time: Instant,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            stage_times: Vec::with_capacity(5),
            records: 0,
            demand_counts: BTreeMap::new(),
            demand_sum: 0,
            start_time: Instant::now(),
        }
    }

    /// Record the duration of a completed stage
    pub fn record_stage(&mut self, stage: Stage, duration: Duration) {
        self.stage_times.push((stage, duration));
    }

    /// Record the predictions of the batch
    pub fn record_predictions(&mut self, demand: &[i64]) {
        self.records += demand.len();
        for &value in demand {
            *self.demand_counts.entry(value).or_insert(0) += 1;
            self.demand_sum += i128::from(value);
        }
    }

    /// Get min / max / mean of the predictions; `None` before any prediction
    pub fn get_prediction_stats(&self) -> Option<PredictionStats> {
        let (&min, _) = self.demand_counts.first_key_value()?;
        let (&max, _) = self.demand_counts.last_key_value()?;
        Some(PredictionStats {
            count: self.records,
            min,
            max,
            mean: self.demand_sum as f64 / self.records as f64,
        })
    }

    /// Most frequent demand values, most frequent first; ties by lower value
    pub fn top_values(&self, n: usize) -> Vec<(i64, u64)> {
        let mut counts: Vec<(i64, u64)> = self
            .demand_counts
            .iter()
            .map(|(&v, &c)| (v, c))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts.truncate(n);
        counts
    }

    /// Records per second over the whole run
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print a summary of the run
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             RIDE DEMAND PREDICTION - RUN SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Records: {:>8}   Throughput: {:>12.1} rec/s               ║",
            self.records,
            self.get_throughput()
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        for (stage, duration) in &self.stage_times {
            info!(
                "║   {:<14} {:>12.3} ms                                ║",
                stage.to_string(),
                duration.as_secs_f64() * 1000.0
            );
        }
        if let Some(stats) = self.get_prediction_stats() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!(
                "║ Demand: min {:>6}  max {:>6}  mean {:>9.2}                   ║",
                stats.min, stats.max, stats.mean
            );
            for (value, count) in self.top_values(10) {
                let pct = count as f64 / stats.count as f64 * 100.0;
                info!(
                    "║   demand {:>6}: {:>8} ({:>5.1}%)                            ║",
                    value, count, pct
                );
            }
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
