//! Sample Artifact Generator
//!
//! Writes a self-consistent artifact directory (model, locations, areas, time
//! bins) and a batch of random ride requests for trying the predictor.
//!
//! Usage: make-sample [models_dir] [input_path] [count] [unknown_rate] [seed]

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::info;

/// Grid of pickup points, in hundredths of a degree
const LAT_RANGE: (i64, i64) = (4170, 4200);
const LNG_RANGE: (i64, i64) = (-8780, -8760);

/// Grid cells per community area side
const AREA_CELLS: i64 = 5;

struct SampleGenerator {
    rng: StdRng,
}

impl SampleGenerator {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    fn grid() -> impl Iterator<Item = (i64, i64)> {
        (LAT_RANGE.0..=LAT_RANGE.1)
            .flat_map(|lat| (LNG_RANGE.0..=LNG_RANGE.1).map(move |lng| (lat, lng)))
    }

    fn location_id(lat: i64, lng: i64) -> i64 {
        let cols = LNG_RANGE.1 - LNG_RANGE.0 + 1;
        (lat - LAT_RANGE.0) * cols + (lng - LNG_RANGE.0)
    }

    fn area_id(lat: i64, lng: i64) -> i64 {
        let cols = (LNG_RANGE.1 - LNG_RANGE.0) / AREA_CELLS + 1;
        (lat - LAT_RANGE.0) / AREA_CELLS * cols + (lng - LNG_RANGE.0) / AREA_CELLS + 1
    }

    fn locations() -> Value {
        Value::Array(
            Self::grid()
                .map(|(lat, lng)| {
                    json!({
                        "lat": lat as f64 / 100.0,
                        "lng": lng as f64 / 100.0,
                        "location": Self::location_id(lat, lng),
                    })
                })
                .collect(),
        )
    }

    fn areas() -> Value {
        Value::Array(
            Self::grid()
                .map(|(lat, lng)| {
                    json!({
                        "location": Self::location_id(lat, lng),
                        "area": Self::area_id(lat, lng)
                    })
                })
                .collect(),
        )
    }

    fn time_bins() -> Value {
        let bins: serde_json::Map<String, Value> = (0..48)
            .map(|i| (format!("{:02}:{:02}:00", i / 2, (i % 2) * 30), json!(i)))
            .collect();
        Value::Object(bins)
    }

    /// Small boosted ensemble: busier on weekends, at rush hours and downtown
    fn model() -> Value {
        json!({
            "kind": "tree_ensemble",
            "base_score": 2.0,
            "aggregation": "sum",
            "trees": [
                {"nodes": [
                    {"feature": "day_of_week", "threshold": 4.5, "left": 1, "right": 2},
                    {"value": 0.0},
                    {"value": 3.5}
                ]},
                {"nodes": [
                    {"feature": "time_bin", "threshold": 13.5, "left": 1, "right": 2},
                    {"value": -1.5},
                    {"feature": "time_bin", "threshold": 19.5, "left": 3, "right": 4},
                    {"value": 4.0},
                    {"feature": "time_bin", "threshold": 33.5, "left": 5, "right": 6},
                    {"value": 1.0},
                    {"value": 2.5}
                ]},
                {"nodes": [
                    {
                        "feature": "pickup_community_area",
                        "categories": [1, 2, 5, 6],
                        "left": 1,
                        "right": 2
                    },
                    {"value": 2.25},
                    {"value": 0.0}
                ]}
            ]
        })
    }

    fn request(&mut self, known: bool) -> Value {
        let (lat, lng) = if known {
            (
                self.rng.gen_range(LAT_RANGE.0..=LAT_RANGE.1),
                self.rng.gen_range(LNG_RANGE.0..=LNG_RANGE.1),
            )
        } else {
            // just outside the grid
            (LAT_RANGE.1 + self.rng.gen_range(1..50), LNG_RANGE.0 - self.rng.gen_range(1..50))
        };
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
            + Duration::days(self.rng.gen_range(0..366));
        let when = day.and_hms_opt(0, 0, 0).unwrap_or_default()
            + Duration::seconds(self.rng.gen_range(0..86_400));

        json!({
            "lat": lat as f64 / 100.0,
            "lng": lng as f64 / 100.0,
            "timestamp": when.format("%Y-%m-%dT%H:%M:%S").to_string(),
        })
    }
}

/// Clamp to `[0, 1]`; NaN and infinities become 0 since `gen_bool` panics on NaN.
fn probability(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("make_sample=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let models_dir = Path::new(args.get(1).map(|s| s.as_str()).unwrap_or("models"));
    let input_path = Path::new(args.get(2).map(|s| s.as_str()).unwrap_or("input.json"));
    let count: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let unknown_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.0);
    let seed: Option<u64> = args.get(5).and_then(|s| s.parse().ok());

    info!(
        models_dir = %models_dir.display(),
        input = %input_path.display(),
        count,
        unknown_rate,
        seed = ?seed,
        "Configuration loaded"
    );

    fs::create_dir_all(models_dir)
        .with_context(|| format!("Failed to create {}", models_dir.display()))?;
    write_json(&models_dir.join("model.json"), &SampleGenerator::model())?;
    write_json(&models_dir.join("locations.json"), &SampleGenerator::locations())?;
    write_json(&models_dir.join("area.json"), &SampleGenerator::areas())?;
    write_json(&models_dir.join("time.json"), &SampleGenerator::time_bins())?;
    info!("Artifacts written to {}", models_dir.display());

    let mut generator = SampleGenerator::new(seed);
    let unknown_rate = probability(unknown_rate);
    let mut unknown = 0;
    let requests: Vec<Value> = (0..count)
        .map(|_| {
            let known = !generator.rng.gen_bool(unknown_rate);
            if !known {
                unknown += 1;
            }
            generator.request(known)
        })
        .collect();
    write_json(input_path, &Value::Array(requests))?;

    info!(
        "Completed! Wrote {} requests ({} outside the known locations) to {}",
        count,
        unknown,
        input_path.display()
    );
    Ok(())
}
