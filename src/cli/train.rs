//! Train command - fit the crowd model on saved labels

use super::write_output;
use anyhow::Result;
use passive_crowd::config::DemoConfig;
use passive_crowd::crowd::{CrowdModel, PassiveCrowd, TrainOptions};
use passive_crowd::pipeline::LabelledData;
use std::path::Path;
use tracing::info;

pub fn run(config: &DemoConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    config.validate()?;
    let data = LabelledData::load(input)?;
    info!(
        "Training on {} samples from {} annotators",
        data.dataset.n_samples(),
        data.annotator_labels.n_annotators()
    );

    let model = PassiveCrowd::new(TrainOptions::from(&config.training));
    let outcome = model.fit(data.dataset.features(), &data.annotator_labels)?;
    info!(
        "EM finished after {} iterations (converged: {}, log-likelihood {:.4})",
        outcome.iterations, outcome.converged, outcome.log_likelihood
    );

    let json = serde_json::to_string_pretty(&outcome)?;
    write_output(&json, output)
}
