//! Synthetic binary classification data
//!
//! A [`Dataset`] is a feature matrix (samples x features) paired row by row
//! with a groundtruth label vector. Both are fixed once generated.

mod make_classification;

pub use make_classification::{make_classification, make_classification_with_rng};
pub(crate) use make_classification::standard_normal;

use crate::error::{CrowdError, CrowdResult};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Features plus groundtruth labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetRecord", into = "DatasetRecord")]
pub struct Dataset {
    features: DMatrix<f64>,
    labels: Vec<u8>,
}

impl Dataset {
    /// Pair a feature matrix with its labels
    pub fn new(features: DMatrix<f64>, labels: Vec<u8>) -> CrowdResult<Self> {
        if features.nrows() == 0 {
            return Err(CrowdError::EmptyDataset("no samples".into()));
        }
        if features.ncols() == 0 {
            return Err(CrowdError::EmptyDataset("no features".into()));
        }
        if labels.len() != features.nrows() {
            return Err(CrowdError::ShapeMismatch {
                expected_annotators: 1,
                expected_samples: features.nrows(),
                actual_annotators: 1,
                actual_samples: labels.len(),
            });
        }
        if let Some((sample, &value)) = labels.iter().enumerate().find(|(_, &v)| v > 1) {
            return Err(CrowdError::NonBinaryLabel {
                annotator: 0,
                sample,
                value,
            });
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &DMatrix<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of samples labelled 1
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}

/// Row-major serialized form
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetRecord {
    features: Vec<Vec<f64>>,
    labels: Vec<u8>,
}

impl From<Dataset> for DatasetRecord {
    fn from(dataset: Dataset) -> Self {
        let features = dataset
            .features
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        Self {
            features,
            labels: dataset.labels,
        }
    }
}

impl TryFrom<DatasetRecord> for Dataset {
    type Error = CrowdError;

    fn try_from(record: DatasetRecord) -> Result<Self, Self::Error> {
        let n_features = record.features.first().map(|r| r.len()).unwrap_or(0);
        if let Some(row) = record.features.iter().find(|r| r.len() != n_features) {
            return Err(CrowdError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }
        let features = DMatrix::from_fn(record.features.len(), n_features, |i, j| {
            record.features[i][j]
        });
        Dataset::new(features, record.labels)
    }
}
