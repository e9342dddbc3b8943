//! The demo pipeline
//!
//! Straight-line driver: generate data, simulate annotators, check the
//! label matrix, fit the crowd model, predict, and collect metrics for the
//! reporters.

use crate::annotators::{agreement, simulate_annotators, standard_panel, AnnotatorLabels, AnnotatorProfile};
use crate::config::DemoConfig;
use crate::crowd::{CrowdModel, PassiveCrowd, TrainOptions, TrainOutcome};
use crate::dataset::{make_classification, Dataset};
use crate::error::{CrowdError, CrowdResult};
use anyhow::Context;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Dataset plus the simulated annotator labels for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledData {
    pub dataset: Dataset,
    pub profiles: Vec<AnnotatorProfile>,
    pub annotator_labels: AnnotatorLabels,
}

impl LabelledData {
    /// Fail unless there is one label row per profile and one column per sample
    pub fn validate(&self) -> CrowdResult<()> {
        let expected = if self.profiles.is_empty() {
            self.annotator_labels.n_annotators()
        } else {
            self.profiles.len()
        };
        self.annotator_labels
            .check_shape(expected, self.dataset.n_samples())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let data: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        data.validate()?;
        Ok(data)
    }
}

/// Generate the dataset and corrupt a label row per annotator
pub fn generate(config: &DemoConfig) -> CrowdResult<LabelledData> {
    config.validate()?;
    let dataset = make_classification(&config.dataset)?;

    let seed = config.annotators.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let profiles = standard_panel(&config.annotators);
    let annotator_labels = simulate_annotators(&dataset, &profiles, &mut rng)?;

    let data = LabelledData {
        dataset,
        profiles,
        annotator_labels,
    };
    data.validate()?;
    info!(
        "Generated {} samples ({} positive) labelled by {} annotators (seed {})",
        data.dataset.n_samples(),
        data.dataset.positives(),
        data.annotator_labels.n_annotators(),
        seed
    );
    Ok(data)
}

/// Agreement of one label source with the groundtruth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorSummary {
    pub index: usize,
    pub profile: Option<AnnotatorProfile>,
    /// Fraction of samples matching the groundtruth
    pub accuracy: f64,
    /// Mean learned expertise over the samples
    pub mean_expertise: f64,
}

/// Headline numbers for a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub prediction_accuracy: f64,
    pub consensus_accuracy: f64,
    pub majority_vote_accuracy: f64,
    pub annotators: Vec<AnnotatorSummary>,
}

impl RunMetrics {
    pub fn compute(data: &LabelledData, outcome: &TrainOutcome, predictions: &[u8]) -> CrowdResult<Self> {
        let truth = data.dataset.labels();
        let expertise = outcome.params.mean_expertise(data.dataset.features())?;
        let annotators = (0..data.annotator_labels.n_annotators())
            .map(|t| AnnotatorSummary {
                index: t,
                profile: data.profiles.get(t).copied(),
                accuracy: data.annotator_labels.agreement(t, truth),
                mean_expertise: expertise.get(t).copied().unwrap_or(f64::NAN),
            })
            .collect();

        Ok(Self {
            prediction_accuracy: agreement(predictions, truth),
            consensus_accuracy: agreement(&outcome.consensus(), truth),
            majority_vote_accuracy: agreement(&data.annotator_labels.majority_vote(), truth),
            annotators,
        })
    }
}

/// Everything a reporter needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoRun {
    pub model: String,
    pub data: LabelledData,
    pub outcome: TrainOutcome,
    pub predictions: Vec<u8>,
    pub metrics: RunMetrics,
}

/// Fit `model` on already generated data
pub fn fit_and_predict(model: &dyn CrowdModel, data: LabelledData) -> CrowdResult<DemoRun> {
    data.validate()?;
    let features = data.dataset.features();
    let outcome = model.fit(features, &data.annotator_labels)?;
    debug!("w: {}", outcome.params.w);
    debug!("g: {}", outcome.params.g.transpose());

    let predictions = model.predict(&outcome.params, features)?;
    if predictions.len() != data.dataset.n_samples() {
        return Err(CrowdError::ShapeMismatch {
            expected_annotators: 1,
            expected_samples: data.dataset.n_samples(),
            actual_annotators: 1,
            actual_samples: predictions.len(),
        });
    }
    let metrics = RunMetrics::compute(&data, &outcome, &predictions)?;
    info!(
        "Prediction accuracy {:.1}%, consensus {:.1}%, majority vote {:.1}%",
        metrics.prediction_accuracy * 100.0,
        metrics.consensus_accuracy * 100.0,
        metrics.majority_vote_accuracy * 100.0
    );

    Ok(DemoRun {
        model: model.name().to_string(),
        data,
        outcome,
        predictions,
        metrics,
    })
}

/// The whole demo: generate, corrupt, train, predict
pub fn run_demo(config: &DemoConfig) -> CrowdResult<DemoRun> {
    let data = generate(config)?;
    let model = PassiveCrowd::new(TrainOptions::from(&config.training));
    fit_and_predict(&model, data)
}
