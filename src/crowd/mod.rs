//! Passive crowd model
//!
//! Learns a classifier for the hidden true label together with an
//! input-dependent expertise model per annotator, from nothing but the
//! features and the annotators' noisy labels:
//!
//! - `p(z = 1 | x) = sigmoid(a.x + b)`
//! - `eta_t(x) = sigmoid(w_t.x + g_t)`, the chance annotator `t` agrees with `z`
//!
//! Fitting is expectation-maximisation over the hidden `z` (see [`train`]).

mod logistic;
mod train;

pub use logistic::sigmoid;
pub use train::{train_crowd, TrainOptions, TrainOutcome};

use crate::annotators::AnnotatorLabels;
use crate::error::{CrowdError, CrowdResult};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Fitted parameters of the passive crowd model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParamsRecord", into = "ParamsRecord")]
pub struct CrowdParams {
    /// Classifier weights
    pub a: DVector<f64>,
    /// Classifier bias
    pub b: f64,
    /// Expertise weights, one row per annotator
    pub w: DMatrix<f64>,
    /// Expertise biases, one per annotator
    pub g: DVector<f64>,
}

impl CrowdParams {
    pub fn n_features(&self) -> usize {
        self.a.len()
    }

    pub fn n_annotators(&self) -> usize {
        self.g.len()
    }

    fn check_features(&self, features: &DMatrix<f64>) -> CrowdResult<()> {
        if features.ncols() != self.n_features() {
            return Err(CrowdError::DimensionMismatch {
                expected: self.n_features(),
                actual: features.ncols(),
            });
        }
        Ok(())
    }

    /// `p(z = 1 | x)` for every row of `features`
    pub fn predict_proba(&self, features: &DMatrix<f64>) -> CrowdResult<Vec<f64>> {
        predict_proba(&self.a, self.b, features)
    }

    /// Hard labels, 1 where `p(z = 1 | x) > 0.5`
    pub fn predict(&self, features: &DMatrix<f64>) -> CrowdResult<Vec<u8>> {
        predict(&self.a, self.b, features)
    }

    /// Annotators x samples matrix of `eta_t(x_i)`
    pub fn expertise(&self, features: &DMatrix<f64>) -> CrowdResult<DMatrix<f64>> {
        self.check_features(features)?;
        let mut scores = &self.w * features.transpose();
        for (t, mut row) in scores.row_iter_mut().enumerate() {
            let bias = self.g[t];
            row.apply(|s| *s = sigmoid(*s + bias));
        }
        Ok(scores)
    }

    /// Average expertise of each annotator over `features`
    pub fn mean_expertise(&self, features: &DMatrix<f64>) -> CrowdResult<Vec<f64>> {
        let eta = self.expertise(features)?;
        Ok(eta.row_iter().map(|row| row.mean()).collect())
    }
}

/// `p(z = 1 | x) = sigmoid(a.x + b)` per sample
pub fn predict_proba(a: &DVector<f64>, b: f64, features: &DMatrix<f64>) -> CrowdResult<Vec<f64>> {
    if features.ncols() != a.len() {
        return Err(CrowdError::DimensionMismatch {
            expected: a.len(),
            actual: features.ncols(),
        });
    }
    Ok((features * a).iter().map(|s| sigmoid(s + b)).collect())
}

/// Binary prediction per sample from classifier weights `a` and bias `b`
pub fn predict(a: &DVector<f64>, b: f64, features: &DMatrix<f64>) -> CrowdResult<Vec<u8>> {
    Ok(predict_proba(a, b, features)?
        .into_iter()
        .map(|p| u8::from(p > 0.5))
        .collect())
}

/// Fit with the `(a, b, w, g)` tuple interface
pub fn train(
    features: &DMatrix<f64>,
    labels: &AnnotatorLabels,
    lr_init: bool,
    skip_zeros: bool,
) -> CrowdResult<(DVector<f64>, f64, DMatrix<f64>, DVector<f64>)> {
    let options = TrainOptions {
        lr_init,
        skip_zeros,
        ..TrainOptions::default()
    };
    let CrowdParams { a, b, w, g } = train_crowd(features, labels, &options)?.params;
    Ok((a, b, w, g))
}

/// A learner that turns multi-annotator labels into a consensus classifier
pub trait CrowdModel {
    /// Human-readable model name
    fn name(&self) -> &'static str;

    /// Fit on features and the annotators x samples label matrix
    fn fit(&self, features: &DMatrix<f64>, labels: &AnnotatorLabels) -> CrowdResult<TrainOutcome>;

    /// Hard labels for new samples
    fn predict(&self, params: &CrowdParams, features: &DMatrix<f64>) -> CrowdResult<Vec<u8>> {
        params.predict(features)
    }
}

/// EM-trained passive crowd model
#[derive(Debug, Clone, Default)]
pub struct PassiveCrowd {
    options: TrainOptions,
}

impl PassiveCrowd {
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }
}

impl CrowdModel for PassiveCrowd {
    fn name(&self) -> &'static str {
        "passive-crowd"
    }

    fn fit(&self, features: &DMatrix<f64>, labels: &AnnotatorLabels) -> CrowdResult<TrainOutcome> {
        train_crowd(features, labels, &self.options)
    }
}

/// Row-major serialized form
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParamsRecord {
    a: Vec<f64>,
    b: f64,
    w: Vec<Vec<f64>>,
    g: Vec<f64>,
}

impl From<CrowdParams> for ParamsRecord {
    fn from(params: CrowdParams) -> Self {
        Self {
            a: params.a.iter().copied().collect(),
            b: params.b,
            w: params
                .w
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
            g: params.g.iter().copied().collect(),
        }
    }
}

impl TryFrom<ParamsRecord> for CrowdParams {
    type Error = CrowdError;

    fn try_from(record: ParamsRecord) -> Result<Self, Self::Error> {
        let d = record.a.len();
        if let Some(row) = record.w.iter().find(|r| r.len() != d) {
            return Err(CrowdError::DimensionMismatch {
                expected: d,
                actual: row.len(),
            });
        }
        if record.w.len() != record.g.len() {
            return Err(CrowdError::ShapeMismatch {
                expected_annotators: record.g.len(),
                expected_samples: d,
                actual_annotators: record.w.len(),
                actual_samples: d,
            });
        }
        Ok(Self {
            w: DMatrix::from_fn(record.w.len(), d, |t, j| record.w[t][j]),
            a: DVector::from_vec(record.a),
            b: record.b,
            g: DVector::from_vec(record.g),
        })
    }
}
