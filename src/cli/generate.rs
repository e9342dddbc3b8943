//! Generate command - dataset plus simulated annotator labels as JSON

use super::write_output;
use anyhow::Result;
use passive_crowd::config::DemoConfig;
use passive_crowd::pipeline;
use std::path::Path;

pub fn run(config: &DemoConfig, output: Option<&Path>) -> Result<()> {
    let data = pipeline::generate(config)?;
    let json = serde_json::to_string_pretty(&data)?;
    write_output(&json, output)
}
