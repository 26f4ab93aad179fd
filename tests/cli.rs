//! Runs the `predict` binary against artifacts in a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

fn predict_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_predict"))
}

fn write(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string(value).expect("serialize")).expect("write fixture");
}

/// Artifacts under `<tmp>/models` and an input batch at `<tmp>/input.json`.
fn workspace(records: Value) -> TempDir {
    let dir = tempdir().expect("tempdir");
    let models = dir.path().join("models");
    fs::create_dir(&models).expect("models dir");

    write(
        &models.join("model.json"),
        &json!({"kind": "linear", "intercept": 3.6}),
    );
    write(
        &models.join("locations.json"),
        &json!([{"lat": 41.88, "lng": -87.63, "location": "loc7"}]),
    );
    write(
        &models.join("area.json"),
        &json!([{"location": "loc7", "area": 12}]),
    );
    write(
        &models.join("time.json"),
        &json!({"14:00:00": "tb28", "14:30:00": "tb29"}),
    );
    write(&dir.path().join("input.json"), &records);
    dir
}

fn known_batch() -> Value {
    json!([{"lat": 41.88, "lng": -87.63, "timestamp": "2024-03-04T14:37:00"}])
}

fn run_predict(dir: &Path, args: &[&str]) -> Output {
    Command::new(predict_bin())
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("run predict")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn success_writes_default_output_and_reports_path() {
    let dir = workspace(known_batch());

    let output = run_predict(dir.path(), &["-i", "input.json", "--models", "models"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(
        stdout(&output).contains("Predictions saved to output.json"),
        "stdout: {}",
        stdout(&output)
    );
    let written = fs::read_to_string(dir.path().join("output.json")).expect("output.json");
    assert_eq!(
        written,
        r#"[{"lat":41.88,"lng":-87.63,"timestamp":"2024-03-04T14:37:00","demand":4}]"#
    );
}

#[test]
fn explicit_output_path_is_used() {
    let dir = workspace(known_batch());

    let output = run_predict(
        dir.path(),
        &["--input", "input.json", "--output", "out/result.json", "--models", "models"],
    );
    assert_eq!(output.status.code(), Some(1), "missing parent directory must fail");
    assert!(stderr(&output).contains("Error during saving output file: "));

    fs::create_dir(dir.path().join("out")).expect("out dir");
    let output = run_predict(
        dir.path(),
        &["--input", "input.json", "--output", "out/result.json", "--models", "models"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Predictions saved to out/result.json"));
    assert!(dir.path().join("out/result.json").is_file());
    assert!(!dir.path().join("output.json").exists());
}

#[test]
fn unknown_location_exits_with_one_and_writes_nothing() {
    let dir = workspace(json!([
        {"lat": 41.88, "lng": -87.63, "timestamp": "2024-03-04T14:37:00"},
        {"lat": 40.0, "lng": -80.0, "timestamp": "2024-03-04T14:37:00"}
    ]));

    let output = run_predict(dir.path(), &["-i", "input.json", "--models", "models"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("Wrong data provided: Wrong coordinates"),
        "stderr: {}",
        stderr(&output)
    );
    assert!(!stdout(&output).contains("Predictions saved"));
    assert!(!dir.path().join("output.json").exists());
}

#[test]
fn missing_input_reports_reading_stage() {
    let dir = workspace(known_batch());

    let output = run_predict(dir.path(), &["-i", "absent.json", "--models", "models"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error during opening input file: "));
}

#[test]
fn models_flag_overrides_configured_directory() {
    let dir = workspace(known_batch());
    fs::write(
        dir.path().join("predictor.toml"),
        "[artifacts]\ndir = \"nowhere\"\n",
    )
    .expect("config");

    let output = run_predict(dir.path(), &["-i", "input.json", "-c", "predictor.toml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("Unable to load models: "),
        "stderr: {}",
        stderr(&output)
    );

    let output = run_predict(
        dir.path(),
        &["-i", "input.json", "-c", "predictor.toml", "--models", "models"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("output.json").is_file());
}

#[test]
fn input_flag_is_required() {
    let dir = workspace(known_batch());

    let output = run_predict(dir.path(), &[]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("--input"));
}
