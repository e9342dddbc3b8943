//! Simulated annotators
//!
//! An [`AnnotatorLabels`] matrix holds one row of binary labels per
//! annotator, one column per sample. Rows start as copies of the
//! groundtruth and each annotator's [`AnnotatorProfile`] then corrupts its
//! own row only, so the order profiles are applied in never matters for
//! what another annotator sees.

mod profile;

pub use profile::{flip_count, simulate_annotators, standard_panel, AnnotatorProfile};

use crate::error::{CrowdError, CrowdResult};
use serde::{Deserialize, Serialize};

/// Annotators x samples grid of binary labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct AnnotatorLabels {
    rows: Vec<Vec<u8>>,
}

impl AnnotatorLabels {
    /// Every annotator starts out agreeing with `groundtruth`
    pub fn broadcast(groundtruth: &[u8], n_annotators: usize) -> Self {
        Self {
            rows: vec![groundtruth.to_vec(); n_annotators],
        }
    }

    /// Build from explicit rows, checking they are rectangular and binary
    pub fn from_rows(rows: Vec<Vec<u8>>) -> CrowdResult<Self> {
        let n_samples = match rows.first() {
            Some(r) if !r.is_empty() => r.len(),
            _ => return Err(CrowdError::EmptyDataset("no annotator labels".into())),
        };
        for (t, row) in rows.iter().enumerate() {
            if row.len() != n_samples {
                return Err(CrowdError::ShapeMismatch {
                    expected_annotators: rows.len(),
                    expected_samples: n_samples,
                    actual_annotators: rows.len(),
                    actual_samples: row.len(),
                });
            }
            if let Some((i, &value)) = row.iter().enumerate().find(|(_, &v)| v > 1) {
                return Err(CrowdError::NonBinaryLabel {
                    annotator: t,
                    sample: i,
                    value,
                });
            }
        }
        Ok(Self { rows })
    }

    pub fn n_annotators(&self) -> usize {
        self.rows.len()
    }

    pub fn n_samples(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// (annotators, samples)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_annotators(), self.n_samples())
    }

    pub fn row(&self, annotator: usize) -> &[u8] {
        &self.rows[annotator]
    }

    pub(crate) fn row_mut(&mut self, annotator: usize) -> &mut [u8] {
        &mut self.rows[annotator]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn get(&self, annotator: usize, sample: usize) -> u8 {
        self.rows[annotator][sample]
    }

    /// Fail unless the matrix is exactly `n_annotators x n_samples`
    pub fn check_shape(&self, n_annotators: usize, n_samples: usize) -> CrowdResult<()> {
        let (actual_annotators, actual_samples) = self.shape();
        if actual_annotators != n_annotators || actual_samples != n_samples {
            return Err(CrowdError::ShapeMismatch {
                expected_annotators: n_annotators,
                expected_samples: n_samples,
                actual_annotators,
                actual_samples,
            });
        }
        Ok(())
    }

    /// Per-sample majority label (ties go to 1)
    pub fn majority_vote(&self) -> Vec<u8> {
        let n = self.n_annotators();
        (0..self.n_samples())
            .map(|i| {
                let ones = self.rows.iter().filter(|r| r[i] == 1).count();
                u8::from(2 * ones >= n)
            })
            .collect()
    }

    /// Fraction of samples where `annotator` matches `reference`
    pub fn agreement(&self, annotator: usize, reference: &[u8]) -> f64 {
        agreement(&self.rows[annotator], reference)
    }
}

/// Fraction of positions where two label vectors agree
pub fn agreement(labels: &[u8], reference: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let same = labels
        .iter()
        .zip(reference.iter())
        .filter(|(a, b)| a == b)
        .count();
    same as f64 / labels.len() as f64
}

impl TryFrom<Vec<Vec<u8>>> for AnnotatorLabels {
    type Error = CrowdError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<AnnotatorLabels> for Vec<Vec<u8>> {
    fn from(labels: AnnotatorLabels) -> Self {
        labels.rows
    }
}
