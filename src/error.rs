//! Domain errors for dataset synthesis, label simulation and crowd training

use thiserror::Error;

/// Errors that can occur anywhere in the crowd-labelling pipeline
#[derive(Error, Debug)]
pub enum CrowdError {
    #[error("Label matrix has shape {actual_annotators}x{actual_samples}, expected {expected_annotators}x{expected_samples}")]
    ShapeMismatch {
        expected_annotators: usize,
        expected_samples: usize,
        actual_annotators: usize,
        actual_samples: usize,
    },

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Label {value} at annotator {annotator}, sample {sample} is not binary")]
    NonBinaryLabel {
        annotator: usize,
        sample: usize,
        value: u8,
    },

    #[error("Parameters expect {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type CrowdResult<T> = Result<T, CrowdError>;
