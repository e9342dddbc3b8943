//! Text (terminal) reporter with colors and formatting

use crate::pipeline::DemoRun;
use anyhow::Result;
use std::fmt::Write;

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Accuracy colors (ANSI escape codes)
fn accuracy_color(accuracy: f64) -> &'static str {
    if accuracy >= 0.9 {
        "\x1b[32m" // Green
    } else if accuracy >= 0.75 {
        "\x1b[33m" // Yellow
    } else {
        "\x1b[31m" // Red
    }
}

fn format_percent(accuracy: f64) -> String {
    format!("{}{:5.1}%{}", accuracy_color(accuracy), accuracy * 100.0, RESET)
}

fn format_vector<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    let parts: Vec<String> = values.map(|v| format!("{:8.4}", v)).collect();
    format!("[{}]", parts.join(" "))
}

/// Render run as formatted terminal output
pub fn render(run: &DemoRun) -> Result<String> {
    let mut out = String::new();
    let data = &run.data;
    let outcome = &run.outcome;
    let params = &outcome.params;

    writeln!(out, "\n{}Passive crowd demo{} {}({}){}", BOLD, RESET, DIM, run.model, RESET)?;
    writeln!(
        out,
        "  samples {}  features {}  annotators {}  positives {}",
        data.dataset.n_samples(),
        data.dataset.n_features(),
        data.annotator_labels.n_annotators(),
        data.dataset.positives()
    )?;
    writeln!(
        out,
        "  EM: {} iterations ({}), log-likelihood {:.4}",
        outcome.iterations,
        if outcome.converged { "converged" } else { "not converged" },
        outcome.log_likelihood
    )?;

    writeln!(out, "\n{}w:{}", BOLD, RESET)?;
    for row in params.w.row_iter() {
        writeln!(out, "  {}", format_vector(row.iter()))?;
    }
    writeln!(out, "{}g:{}", BOLD, RESET)?;
    writeln!(out, "  {}", format_vector(params.g.iter()))?;

    let m = &run.metrics;
    writeln!(out, "\n{}Accuracy vs groundtruth{}", BOLD, RESET)?;
    writeln!(out, "  predictions     {}", format_percent(m.prediction_accuracy))?;
    writeln!(out, "  consensus       {}", format_percent(m.consensus_accuracy))?;
    writeln!(out, "  majority vote   {}", format_percent(m.majority_vote_accuracy))?;

    writeln!(out, "\n{}Annotators{}", BOLD, RESET)?;
    writeln!(
        out,
        "  {}{:>3}  {:<26} {:>8}  {:>9}{}",
        DIM, "#", "profile", "accuracy", "expertise", RESET
    )?;
    for summary in &m.annotators {
        let profile = summary
            .profile
            .map(|p| p.describe())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "  {:>3}  {:<26} {}  {:>9.3}",
            summary.index + 1,
            profile,
            format_percent(summary.accuracy),
            summary.mean_expertise
        )?;
    }

    Ok(out)
}
