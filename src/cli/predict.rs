//! Predict command - classify saved samples with a fitted model

use anyhow::{Context, Result};
use passive_crowd::annotators::agreement;
use passive_crowd::crowd::{CrowdParams, TrainOutcome};
use passive_crowd::pipeline::LabelledData;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct PredictionReport {
    probabilities: Vec<f64>,
    predictions: Vec<u8>,
    /// Agreement with the groundtruth stored alongside the features
    accuracy: f64,
}

/// Accept either a full `train` outcome or bare parameters
fn load_params(path: &Path) -> Result<CrowdParams> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if let Ok(outcome) = serde_json::from_str::<TrainOutcome>(&content) {
        return Ok(outcome.params);
    }
    serde_json::from_str::<CrowdParams>(&content)
        .with_context(|| format!("Failed to parse model {}", path.display()))
}

pub fn run(params_path: &Path, input: &Path, format: &str) -> Result<()> {
    let params = load_params(params_path)?;
    let data = LabelledData::load(input)?;
    let features = data.dataset.features();

    let probabilities = params.predict_proba(features)?;
    let predictions = params.predict(features)?;
    let report = PredictionReport {
        accuracy: agreement(&predictions, data.dataset.labels()),
        probabilities,
        predictions,
    };

    let rendered = match format {
        "json" => serde_json::to_string_pretty(&report)?,
        _ => render_text(&report)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn render_text(report: &PredictionReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:>5}  {:>8}  {}", "#", "p(z=1)", "label")?;
    for (i, (p, label)) in report
        .probabilities
        .iter()
        .zip(&report.predictions)
        .enumerate()
    {
        writeln!(out, "{:>5}  {:>8.4}  {}", i, p, label)?;
    }
    writeln!(out, "\naccuracy vs groundtruth: {:.1}%", report.accuracy * 100.0)?;
    Ok(out)
}
