//! CLI contract tests
//!
//! Runs the binary end to end in a scratch directory: demo output in every
//! format, the generate / train / predict chain, init, and failure exits.

use std::path::Path;
use std::process::Command;

fn crowd_bin() -> &'static str {
    env!("CARGO_BIN_EXE_passive-crowd")
}

/// Scratch directory with a small, fully seeded crowd.toml
fn setup_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("crowd.toml"),
        r#"
[dataset]
n_samples = 40
seed = 100

[annotators]
count = 8
seed = 3
"#,
    )
    .unwrap();
    dir
}

fn run_in(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(crowd_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("PASSIVE_CROWD_CONFIG")
        .output()
        .expect("Failed to run passive-crowd");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (code, stdout, stderr)
}

// ============================================================================
// demo
// ============================================================================

#[test]
fn test_default_command_prints_text_summary() {
    let dir = setup_workspace();
    let (code, stdout, stderr) = run_in(dir.path(), &[]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Passive crowd demo"));
    assert!(stdout.contains("w:"));
    assert!(stdout.contains("g:"));
    assert!(stdout.contains("samples 40"));
}

#[test]
fn test_demo_json_is_parseable() {
    let dir = setup_workspace();
    let (code, stdout, stderr) = run_in(dir.path(), &["demo", "--format", "json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let v: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON");
    assert_eq!(v["predictions"].as_array().unwrap().len(), 40);
    let rows = v["data"]["annotator_labels"].as_array().unwrap();
    assert_eq!(rows.len(), 8);
    assert!(rows
        .iter()
        .flat_map(|r| r.as_array().unwrap())
        .all(|x| x.as_u64() == Some(0) || x.as_u64() == Some(1)));
    assert_eq!(v["outcome"]["params"]["g"].as_array().unwrap().len(), 8);
}

#[test]
fn test_demo_seeded_runs_are_identical() {
    let dir = setup_workspace();
    let (_, first, _) = run_in(dir.path(), &["demo", "-f", "json"]);
    let (_, second, _) = run_in(dir.path(), &["demo", "-f", "json"]);
    let a: serde_json::Value = serde_json::from_str(&first).unwrap();
    let b: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_eq!(a["data"]["annotator_labels"], b["data"]["annotator_labels"]);
    assert_eq!(a["predictions"], b["predictions"]);
}

#[test]
fn test_demo_svg_written_to_file() {
    let dir = setup_workspace();
    let (code, _, stderr) = run_in(
        dir.path(),
        &["demo", "--format", "svg", "--output", "plots/crowd.svg"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);

    let svg = std::fs::read_to_string(dir.path().join("plots/crowd.svg")).unwrap();
    assert!(svg.contains("<svg"));
    assert_eq!(svg.matches(r#"<g class="panel">"#).count(), 6);
    assert!(svg.contains("Groundtruth"));
    assert!(svg.contains("Predictions"));
}

#[test]
fn test_demo_output_without_extension_gets_one() {
    let dir = setup_workspace();
    let (code, _, stderr) = run_in(dir.path(), &["demo", "-f", "svg", "-o", "crowd"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(dir.path().join("crowd.svg").exists());
    assert!(!dir.path().join("crowd").exists());
}

#[test]
fn test_demo_cli_overrides_config() {
    let dir = setup_workspace();
    let (code, stdout, stderr) = run_in(
        dir.path(),
        &["demo", "-f", "json", "--samples", "30", "--annotators", "4", "--lr-init"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["predictions"].as_array().unwrap().len(), 30);
    assert_eq!(v["data"]["annotator_labels"].as_array().unwrap().len(), 4);
}

#[test]
fn test_explicit_config_flag() {
    let dir = setup_workspace();
    let other = dir.path().join("other.toml");
    std::fs::write(&other, "[dataset]\nn_samples = 20\n[annotators]\ncount = 5\nseed = 1\n").unwrap();

    let (code, stdout, stderr) = run_in(
        dir.path(),
        &["--config", other.to_str().unwrap(), "demo", "-f", "json"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["predictions"].as_array().unwrap().len(), 20);
}

// ============================================================================
// generate / train / predict
// ============================================================================

#[test]
fn test_generate_train_predict_chain() {
    let dir = setup_workspace();

    let (code, _, stderr) = run_in(dir.path(), &["generate", "-o", "data.json"]);
    assert_eq!(code, 0, "generate failed: {}", stderr);
    let data: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("data.json")).unwrap())
            .unwrap();
    assert_eq!(data["profiles"].as_array().unwrap().len(), 8);

    let (code, _, stderr) = run_in(
        dir.path(),
        &["train", "-i", "data.json", "-o", "model.json", "--skip-zeros"],
    );
    assert_eq!(code, 0, "train failed: {}", stderr);
    let model: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("model.json")).unwrap())
            .unwrap();
    assert_eq!(model["params"]["a"].as_array().unwrap().len(), 2);
    assert_eq!(model["posterior"].as_array().unwrap().len(), 40);

    let (code, stdout, stderr) = run_in(
        dir.path(),
        &["predict", "--params", "model.json", "-i", "data.json", "-f", "json"],
    );
    assert_eq!(code, 0, "predict failed: {}", stderr);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let predictions = report["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 40);
    let accuracy = report["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn test_train_rejects_missing_input() {
    let dir = setup_workspace();
    let (code, _, stderr) = run_in(dir.path(), &["train", "-i", "missing.json"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("missing.json"));
}

#[test]
fn test_train_rejects_ragged_labels() {
    let dir = setup_workspace();
    let (code, _, _) = run_in(dir.path(), &["generate", "-o", "data.json"]);
    assert_eq!(code, 0);

    let path = dir.path().join("data.json");
    let mut data: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    data["annotator_labels"][0].as_array_mut().unwrap().pop();
    std::fs::write(&path, serde_json::to_string(&data).unwrap()).unwrap();

    let (code, _, _) = run_in(dir.path(), &["train", "-i", "data.json"]);
    assert_ne!(code, 0);
}

// ============================================================================
// init and failure modes
// ============================================================================

#[test]
fn test_init_creates_config() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_in(dir.path(), &["init"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Created"));

    let content = std::fs::read_to_string(dir.path().join("crowd.toml")).unwrap();
    let parsed: toml::Value = toml::from_str(&content).unwrap();
    assert_eq!(parsed["annotators"]["count"].as_integer(), Some(20));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("crowd.toml"), "[dataset]\nn_samples = 0\n").unwrap();
    let (code, _, stderr) = run_in(dir.path(), &["demo"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("n_samples"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_format_rejected() {
    let dir = setup_workspace();
    let (code, _, _) = run_in(dir.path(), &["demo", "--format", "html"]);
    assert_eq!(code, 2);
}
