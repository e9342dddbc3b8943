//! Corruption rules for simulated annotators
//!
//! The standard panel mirrors the classic passive-crowd demo:
//! - annotator 0 is only trustworthy on positive samples
//! - annotator 1 is careless and flips a small fixed share of its labels
//! - annotator 2 is only trustworthy where the first feature is positive
//! - everyone else is noisy and flips a large fixed share of labels

use super::AnnotatorLabels;
use crate::config::AnnotatorConfig;
use crate::dataset::Dataset;
use crate::error::{CrowdError, CrowdResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How one annotator departs from the groundtruth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotatorProfile {
    /// Copies the groundtruth
    Faithful,
    /// Correct on positives, coin flip wherever the groundtruth is 0
    ReliableOnPositives,
    /// Correct where `feature` is positive, coin flip elsewhere
    ReliableWhereFeaturePositive { feature: usize },
    /// Flips exactly `flip_count(n, fraction)` distinct samples
    FlipFraction { fraction: f64 },
}

impl AnnotatorProfile {
    /// Corrupt one annotator row in place
    ///
    /// Returns how many samples were redrawn or flipped.
    pub fn corrupt<R: Rng + ?Sized>(
        &self,
        row: &mut [u8],
        dataset: &Dataset,
        rng: &mut R,
    ) -> CrowdResult<usize> {
        match *self {
            AnnotatorProfile::Faithful => Ok(0),
            AnnotatorProfile::ReliableOnPositives => {
                let mut touched = 0;
                for (label, &truth) in row.iter_mut().zip(dataset.labels()) {
                    if truth == 0 {
                        *label = coin(rng);
                        touched += 1;
                    }
                }
                Ok(touched)
            }
            AnnotatorProfile::ReliableWhereFeaturePositive { feature } => {
                if feature >= dataset.n_features() {
                    return Err(CrowdError::DimensionMismatch {
                        expected: feature + 1,
                        actual: dataset.n_features(),
                    });
                }
                let column = dataset.features().column(feature);
                let mut touched = 0;
                for (label, &x) in row.iter_mut().zip(column.iter()) {
                    if x <= 0.0 {
                        *label = coin(rng);
                        touched += 1;
                    }
                }
                Ok(touched)
            }
            AnnotatorProfile::FlipFraction { fraction } => {
                let k = flip_count(row.len(), fraction);
                for i in rand::seq::index::sample(rng, row.len(), k).into_iter() {
                    row[i] = 1 - row[i];
                }
                Ok(k)
            }
        }
    }

    /// Short human-readable description used in reports
    pub fn describe(&self) -> String {
        match self {
            AnnotatorProfile::Faithful => "faithful".to_string(),
            AnnotatorProfile::ReliableOnPositives => "reliable on positives".to_string(),
            AnnotatorProfile::ReliableWhereFeaturePositive { feature } => {
                format!("reliable where x[{}] > 0", feature)
            }
            AnnotatorProfile::FlipFraction { fraction } => {
                format!("flips {:.0}%", fraction * 100.0)
            }
        }
    }
}

/// Round a uniform draw to 0 or 1
fn coin<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random::<f64>().round() as u8
}

/// Number of distinct samples a flip rule touches: floor(n * fraction)
pub fn flip_count(n_samples: usize, fraction: f64) -> usize {
    // Absorb float error in n * fraction before flooring
    let k = (n_samples as f64 * fraction + 1e-9).floor() as usize;
    k.min(n_samples)
}

/// Profiles for a panel of `config.count` annotators
pub fn standard_panel(config: &AnnotatorConfig) -> Vec<AnnotatorProfile> {
    (0..config.count)
        .map(|t| match t {
            0 => AnnotatorProfile::ReliableOnPositives,
            1 => AnnotatorProfile::FlipFraction {
                fraction: config.careless_flip_fraction,
            },
            2 => AnnotatorProfile::ReliableWhereFeaturePositive { feature: 0 },
            _ => AnnotatorProfile::FlipFraction {
                fraction: config.noisy_flip_fraction,
            },
        })
        .collect()
}

/// Broadcast the groundtruth to one row per profile and corrupt each row
pub fn simulate_annotators<R: Rng + ?Sized>(
    dataset: &Dataset,
    profiles: &[AnnotatorProfile],
    rng: &mut R,
) -> CrowdResult<AnnotatorLabels> {
    if profiles.is_empty() {
        return Err(CrowdError::InvalidConfig("at least one annotator is required".into()));
    }

    let mut labels = AnnotatorLabels::broadcast(dataset.labels(), profiles.len());
    for (t, profile) in profiles.iter().enumerate() {
        let touched = profile.corrupt(labels.row_mut(t), dataset, rng)?;
        debug!(
            "Annotator {} ({}): {} labels corrupted",
            t + 1,
            profile.describe(),
            touched
        );
    }

    labels.check_shape(profiles.len(), dataset.n_samples())?;
    Ok(labels)
}
