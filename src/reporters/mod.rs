//! Output reporters for demo runs
//!
//! Supports multiple output formats:
//! - `text` - Terminal summary with colors
//! - `json` - Machine-readable JSON of the whole run
//! - `svg` - Standalone 2x3 grid of scatter plots

mod json;
mod svg;
mod text;

use crate::pipeline::DemoRun;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Svg,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "svg" | "plot" => Ok(OutputFormat::Svg),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, svg",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Svg => write!(f, "svg"),
        }
    }
}

/// Render a run using an OutputFormat enum
pub fn report_with_format(run: &DemoRun, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(run),
        OutputFormat::Json => json::render(run),
        OutputFormat::Svg => svg::render(run),
    }
}

/// Get the recommended file extension for a format
pub fn file_extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Svg => "svg",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use crate::pipeline::run_demo;

    /// Small deterministic run shared by the reporter tests
    pub(crate) fn test_run() -> DemoRun {
        let mut config = DemoConfig::default();
        config.dataset.n_samples = 24;
        config.annotators.count = 6;
        config.annotators.seed = Some(1);
        run_demo(&config).expect("demo run")
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plot".parse::<OutputFormat>().unwrap(), OutputFormat::Svg);
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_display_matches_extension() {
        for format in [OutputFormat::Json, OutputFormat::Svg] {
            assert_eq!(format.to_string(), file_extension(format));
        }
        assert_eq!(file_extension(OutputFormat::Text), "txt");
    }

    #[test]
    fn test_report_dispatches() {
        let run = test_run();
        assert!(report_with_format(&run, OutputFormat::Svg).unwrap().starts_with("<?xml"));
        assert!(report_with_format(&run, OutputFormat::Json)
            .unwrap()
            .trim_start()
            .starts_with('{'));
    }
}
