//! CLI command definitions and handlers

mod demo;
mod generate;
mod init;
mod predict;
mod train;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use passive_crowd::config::{load_demo_config, DemoConfig};
use std::path::{Path, PathBuf};

/// Parse and validate a fraction-free positive count
fn parse_count(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("value must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

/// passive-crowd - learn from unreliable annotators
#[derive(Parser, Debug)]
#[command(name = "passive-crowd")]
#[command(
    version,
    about = "Simulate unreliable annotators and recover the truth with a passive crowd EM model",
    long_about = "passive-crowd synthesizes a 2-D binary classification problem, fabricates \
noisy labels from a panel of annotators with different reliability patterns, fits an \
expectation-maximisation model of annotator expertise, and reports the consensus \
against the groundtruth.\n\n\
Run without a subcommand to execute the full demo with default settings.",
    after_help = "\
Examples:
  passive-crowd                                   Run the demo, print a text summary
  passive-crowd demo --format svg -o crowd.svg    Write the 2x3 scatter grid
  passive-crowd demo --lr-init --annotators 10    Tweak the run from the command line
  passive-crowd generate -o data.json             Save dataset + annotator labels
  passive-crowd train -i data.json -o model.json  Fit on saved labels
  passive-crowd predict --params model.json -i data.json"
)]
pub struct Cli {
    /// Config file (default: ./crowd.toml, then ~/.config/passive-crowd/config.toml)
    #[arg(long, global = true, env = "PASSIVE_CROWD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// EM settings that can be overridden per run
#[derive(Args, Debug, Clone, Default)]
pub struct TrainingOverrides {
    /// Initialise the classifier from a majority-vote logistic regression
    #[arg(long)]
    pub lr_init: bool,

    /// Skip likelihood factors that underflow to zero instead of clamping them
    #[arg(long)]
    pub skip_zeros: bool,

    /// Maximum EM iterations
    #[arg(long, value_parser = parse_count)]
    pub max_iterations: Option<usize>,

    /// Convergence threshold on the largest parameter change
    #[arg(long)]
    pub epsilon: Option<f64>,
}

/// Dataset and annotator settings that can be overridden per run
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// Number of samples to generate
    #[arg(long, value_parser = parse_count)]
    pub samples: Option<usize>,

    /// Number of simulated annotators
    #[arg(long, value_parser = parse_count)]
    pub annotators: Option<usize>,

    /// Dataset seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seed for label corruption (default: fresh each run)
    #[arg(long)]
    pub annotator_seed: Option<u64>,

    #[command(flatten)]
    pub training: TrainingOverrides,
}

impl TrainingOverrides {
    pub fn apply(&self, config: &mut DemoConfig) {
        if self.lr_init {
            config.training.lr_init = true;
        }
        if self.skip_zeros {
            config.training.skip_zeros = true;
        }
        if let Some(n) = self.max_iterations {
            config.training.max_iterations = n;
        }
        if let Some(eps) = self.epsilon {
            config.training.epsilon = eps;
        }
    }
}

impl RunOverrides {
    pub fn apply(&self, config: &mut DemoConfig) {
        if let Some(n) = self.samples {
            config.dataset.n_samples = n;
        }
        if let Some(n) = self.annotators {
            config.annotators.count = n;
        }
        if let Some(seed) = self.seed {
            config.dataset.seed = seed;
        }
        if let Some(seed) = self.annotator_seed {
            config.annotators.seed = Some(seed);
        }
        self.training.apply(config);
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a commented crowd.toml with the default settings
    Init {
        /// Directory to write crowd.toml into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing crowd.toml
        #[arg(long)]
        force: bool,
    },

    /// Generate data, simulate annotators, train, predict and report
    #[command(after_help = "\
Examples:
  passive-crowd demo                          Text summary on stdout
  passive-crowd demo --format json            Whole run as JSON
  passive-crowd demo --format svg -o out.svg  Groundtruth / annotators / predictions plot")]
    Demo {
        /// Output format: text, json, svg (default: from config, else text)
        #[arg(long, short = 'f', value_parser = ["text", "json", "svg"])]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Generate a dataset with simulated annotator labels as JSON
    Generate {
        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Fit the crowd model on labels written by `generate`
    Train {
        /// Labelled data JSON from `generate`
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Output file for the fitted model (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: TrainingOverrides,
    },

    /// Predict labels with a model written by `train`
    Predict {
        /// Model JSON from `train`
        #[arg(long)]
        params: PathBuf,

        /// Labelled data JSON whose features are classified
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Output format: text or json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

/// Load config from `--config` or the usual locations
fn load_config(cli_config: Option<&Path>) -> Result<DemoConfig> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    load_demo_config(cli_config, &cwd)
}

/// Write to `path` or stdout
fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote {}",
                console::style("✓").green(),
                console::style(path.display()).cyan()
            );
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Init { path, force }) => init::run(&path, force),

        Some(Commands::Demo {
            format,
            output,
            overrides,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            overrides.apply(&mut config);
            demo::run(&config, format.as_deref(), output.as_deref())
        }

        Some(Commands::Generate { output, overrides }) => {
            let mut config = load_config(cli.config.as_deref())?;
            overrides.apply(&mut config);
            generate::run(&config, output.as_deref())
        }

        Some(Commands::Train {
            input,
            output,
            overrides,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            overrides.apply(&mut config);
            train::run(&config, &input, output.as_deref())
        }

        Some(Commands::Predict {
            params,
            input,
            format,
        }) => predict::run(&params, &input, &format),

        None => {
            let config = load_config(cli.config.as_deref())?;
            demo::run(&config, None, None)
        }
    }
}
