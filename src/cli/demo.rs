//! Demo command - the full generate / train / predict / report run

use super::write_output;
use anyhow::Result;
use passive_crowd::config::DemoConfig;
use passive_crowd::pipeline::run_demo;
use passive_crowd::reporters::{self, OutputFormat};
use std::path::{Path, PathBuf};
use tracing::info;

/// Run the demo
pub fn run(config: &DemoConfig, format: Option<&str>, output: Option<&Path>) -> Result<()> {
    let format: OutputFormat = format.unwrap_or(config.output.format.as_str()).parse()?;
    let output = output
        .or(config.output.path.as_deref())
        .map(|path| with_default_extension(path, format));

    let run = run_demo(config)?;
    info!(
        "EM finished after {} iterations (converged: {})",
        run.outcome.iterations, run.outcome.converged
    );

    let rendered = reporters::report_with_format(&run, format)?;
    write_output(&rendered, output.as_deref())
}

/// `crowd` becomes `crowd.svg` for SVG output; explicit extensions are kept
fn with_default_extension(path: &Path, format: OutputFormat) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(reporters::file_extension(format))
    }
}
