//! Run configuration
//!
//! Supports loading config from:
//! - An explicit `--config` path
//! - `crowd.toml` in the working directory
//! - ~/.config/passive-crowd/config.toml
//!
//! Anything not set falls back to the defaults of the classic demo:
//! 50 samples, 2 informative features, 20 annotators.

use crate::error::{CrowdError, CrowdResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "crowd.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub annotators: AnnotatorConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters of the synthetic classification problem
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_informative: usize,
    pub n_redundant: usize,
    pub n_clusters_per_class: usize,
    /// Half the edge length of the hypercube the cluster centroids sit on
    pub class_sep: f64,
    /// Fraction of samples whose class is reassigned at random
    pub flip_y: f64,
    pub seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            n_samples: 50,
            n_features: 2,
            n_informative: 2,
            n_redundant: 0,
            n_clusters_per_class: 2,
            class_sep: 1.0,
            flip_y: 0.01,
            seed: 100,
        }
    }
}

/// Simulated annotator panel
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub count: usize,
    /// Seed for label corruption. Unset means a fresh seed every run.
    pub seed: Option<u64>,
    /// Flip rate of the single careless annotator (annotator 1)
    pub careless_flip_fraction: f64,
    /// Flip rate of every annotator from index 3 on
    pub noisy_flip_fraction: f64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            count: 20,
            seed: None,
            careless_flip_fraction: 0.1,
            noisy_flip_fraction: 0.3,
        }
    }
}

/// EM training parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Initialise the classifier from a majority-vote logistic regression
    pub lr_init: bool,
    /// Skip likelihood factors that underflow to zero instead of clamping them
    pub skip_zeros: bool,
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Newton steps per M-step regression
    pub newton_iterations: usize,
    /// Ridge penalty on the non-bias weights
    pub l2: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            lr_init: false,
            skip_zeros: false,
            epsilon: 1e-5,
            max_iterations: 100,
            newton_iterations: 50,
            l2: 1e-2,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// text, json or svg
    pub format: String,
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            path: None,
        }
    }
}

impl DemoConfig {
    /// Reject values the generator or trainer cannot work with
    pub fn validate(&self) -> CrowdResult<()> {
        let d = &self.dataset;
        if d.n_samples == 0 {
            return Err(CrowdError::InvalidConfig("n_samples must be at least 1".into()));
        }
        if d.n_features == 0 {
            return Err(CrowdError::InvalidConfig("n_features must be at least 1".into()));
        }
        if d.n_informative == 0 {
            return Err(CrowdError::InvalidConfig("n_informative must be at least 1".into()));
        }
        if d.n_informative + d.n_redundant > d.n_features {
            return Err(CrowdError::InvalidConfig(format!(
                "n_informative ({}) + n_redundant ({}) exceeds n_features ({})",
                d.n_informative, d.n_redundant, d.n_features
            )));
        }
        if d.n_clusters_per_class == 0 {
            return Err(CrowdError::InvalidConfig(
                "n_clusters_per_class must be at least 1".into(),
            ));
        }
        // Every cluster needs its own hypercube vertex
        let vertices = 2u128.checked_pow(d.n_informative as u32).unwrap_or(u128::MAX);
        if (2 * d.n_clusters_per_class) as u128 > vertices {
            return Err(CrowdError::InvalidConfig(format!(
                "2 classes x {} clusters need more than 2^{} hypercube vertices",
                d.n_clusters_per_class, d.n_informative
            )));
        }
        if !d.class_sep.is_finite() {
            return Err(CrowdError::InvalidConfig(format!(
                "class_sep must be finite, got {}",
                d.class_sep
            )));
        }
        check_fraction("flip_y", d.flip_y)?;

        let a = &self.annotators;
        if a.count == 0 {
            return Err(CrowdError::InvalidConfig("annotator count must be at least 1".into()));
        }
        check_fraction("careless_flip_fraction", a.careless_flip_fraction)?;
        check_fraction("noisy_flip_fraction", a.noisy_flip_fraction)?;

        let t = &self.training;
        if !(t.epsilon > 0.0) {
            return Err(CrowdError::InvalidConfig("epsilon must be positive".into()));
        }
        if t.max_iterations == 0 {
            return Err(CrowdError::InvalidConfig("max_iterations must be at least 1".into()));
        }
        if !(t.l2 >= 0.0) || t.l2.is_infinite() {
            return Err(CrowdError::InvalidConfig("l2 must be a finite non-negative number".into()));
        }
        Ok(())
    }

    /// Get the user config path (~/.config/passive-crowd/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("passive-crowd").join("config.toml"))
    }
}

fn check_fraction(name: &str, value: f64) -> CrowdResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CrowdError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

/// Load the run configuration
///
/// An explicit path must exist and parse. Implicit locations are tried in
/// order and a broken file only produces a warning.
pub fn load_demo_config(explicit: Option<&Path>, working_dir: &Path) -> anyhow::Result<DemoConfig> {
    if let Some(path) = explicit {
        let config = load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        return Ok(config);
    }

    let candidates = std::iter::once(working_dir.join(PROJECT_CONFIG_FILE))
        .chain(DemoConfig::user_config_path());

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_toml_config(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                return Ok(config);
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    Ok(DemoConfig::default())
}

fn load_toml_config(path: &Path) -> anyhow::Result<DemoConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: DemoConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Commented example written by `passive-crowd init`
pub const EXAMPLE_CONFIG: &str = r#"# passive-crowd configuration

[dataset]
n_samples = 50
n_features = 2
n_informative = 2
n_redundant = 0
n_clusters_per_class = 2
class_sep = 1.0
# Fraction of samples whose class is reassigned at random
flip_y = 0.01
seed = 100

[annotators]
count = 20
# Leave unset for a fresh corruption every run
# seed = 7
# Annotator 1 flips this fraction of its labels
careless_flip_fraction = 0.1
# Annotators 3 and up flip this fraction of their labels
noisy_flip_fraction = 0.3

[training]
# Start the classifier from a logistic regression on the majority vote
lr_init = false
# Skip likelihood factors that underflow to zero instead of clamping them
skip_zeros = false
epsilon = 1e-5
max_iterations = 100
newton_iterations = 50
l2 = 0.01
seed = 0

[output]
# text, json or svg
format = "text"
# path = "crowd.svg"
"#;
