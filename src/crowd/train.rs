//! Expectation-maximisation for the passive crowd model
//!
//! E-step: posterior `mu_i = p(z_i = 1 | x_i, y_i)` from the current
//! classifier prior and every annotator's expertise.
//! M-step: refit the classifier on the soft targets `mu`, and each
//! annotator's expertise on the soft agreement targets
//! `c_ti = mu_i` where `y_ti = 1`, `1 - mu_i` where `y_ti = 0`.
//!
//! Iterates until no parameter moves more than `epsilon`.

use super::logistic::{augment, sigmoid, LogisticFit};
use super::CrowdParams;
use crate::annotators::AnnotatorLabels;
use crate::config::TrainingConfig;
use crate::dataset::standard_normal;
use crate::error::{CrowdError, CrowdResult};
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Probabilities are clamped here before taking logs unless zeros are skipped
const PROB_FLOOR: f64 = 1e-12;

/// Scale of the random classifier initialisation
const INIT_SCALE: f64 = 0.1;

/// Initial expertise bias: annotators start out better than chance
const INIT_EXPERTISE_BIAS: f64 = 1.0;

/// EM configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    /// Initialise the classifier from a logistic regression on the majority vote
    pub lr_init: bool,
    /// Skip likelihood factors that underflow to zero instead of clamping them
    pub skip_zeros: bool,
    pub epsilon: f64,
    pub max_iterations: usize,
    pub newton_iterations: usize,
    pub l2: f64,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for TrainOptions {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            lr_init: config.lr_init,
            skip_zeros: config.skip_zeros,
            epsilon: config.epsilon,
            max_iterations: config.max_iterations,
            newton_iterations: config.newton_iterations,
            l2: config.l2,
            seed: config.seed,
        }
    }
}

/// Result of an EM run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub params: CrowdParams,
    /// EM iterations performed
    pub iterations: usize,
    pub converged: bool,
    /// Marginal log-likelihood of the annotator labels at the final parameters
    pub log_likelihood: f64,
    /// `p(z_i = 1 | x_i, y_i)` at the final parameters
    pub posterior: Vec<f64>,
}

impl TrainOutcome {
    /// Consensus labels from the posterior
    pub fn consensus(&self) -> Vec<u8> {
        self.posterior.iter().map(|&p| u8::from(p > 0.5)).collect()
    }
}

/// Fit the passive crowd model
pub fn train_crowd(
    features: &DMatrix<f64>,
    labels: &AnnotatorLabels,
    options: &TrainOptions,
) -> CrowdResult<TrainOutcome> {
    let (n, d) = features.shape();
    if n == 0 || d == 0 {
        return Err(CrowdError::EmptyDataset(format!("{} samples x {} features", n, d)));
    }
    labels.check_shape(labels.n_annotators(), n)?;
    if labels.n_annotators() == 0 {
        return Err(CrowdError::EmptyDataset("no annotators".into()));
    }

    let design = augment(features);
    let solver = LogisticFit::new(&design, options.l2, options.newton_iterations);
    let mut params = initial_params(&solver, labels, d, options);

    let mut converged = false;
    let mut iterations = 0;
    for iteration in 1..=options.max_iterations {
        let (posterior, log_likelihood) = e_step(&design, labels, &params, options.skip_zeros);
        let updated = m_step(&solver, labels, &posterior, &params);
        let change = max_change(&params, &updated);
        debug!(
            "EM iteration {}: log_likelihood={:.6}, max_change={:.3e}",
            iteration, log_likelihood, change
        );

        params = updated;
        iterations = iteration;
        if change < options.epsilon {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            "EM stopped after {} iterations without reaching epsilon={:e}",
            iterations, options.epsilon
        );
    }

    let (posterior, log_likelihood) = e_step(&design, labels, &params, options.skip_zeros);
    info!(
        "Trained on {} samples from {} annotators in {} iterations (log_likelihood={:.4})",
        n,
        labels.n_annotators(),
        iterations,
        log_likelihood
    );

    Ok(TrainOutcome {
        params,
        iterations,
        converged,
        log_likelihood,
        posterior,
    })
}

fn initial_params(
    solver: &LogisticFit<'_>,
    labels: &AnnotatorLabels,
    d: usize,
    options: &TrainOptions,
) -> CrowdParams {
    let classifier = if options.lr_init {
        let votes = labels.majority_vote();
        let targets = DVector::from_iterator(votes.len(), votes.iter().map(|&v| f64::from(v)));
        let theta = solver.fit(&targets, DVector::zeros(d + 1));
        debug!("Initialised classifier from majority vote: {:?}", theta.as_slice());
        theta
    } else {
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        DVector::from_fn(d + 1, |_, _| INIT_SCALE * standard_normal(&mut rng))
    };

    let t = labels.n_annotators();
    CrowdParams {
        a: classifier.rows(0, d).into_owned(),
        b: classifier[d],
        w: DMatrix::zeros(t, d),
        g: DVector::from_element(t, INIT_EXPERTISE_BIAS),
    }
}

/// `[weights.., bias]` of the classifier
fn classifier_theta(params: &CrowdParams) -> DVector<f64> {
    let d = params.a.len();
    DVector::from_fn(d + 1, |j, _| if j < d { params.a[j] } else { params.b })
}

/// `[weights.., bias]` of annotator `t`
fn annotator_theta(params: &CrowdParams, t: usize) -> DVector<f64> {
    let d = params.w.ncols();
    DVector::from_fn(d + 1, |j, _| if j < d { params.w[(t, j)] } else { params.g[t] })
}

/// Natural log of a likelihood factor, or `None` when it should be skipped
fn log_factor(p: f64, skip_zeros: bool) -> Option<f64> {
    if skip_zeros {
        (p > 0.0).then(|| p.ln())
    } else {
        Some(p.max(PROB_FLOOR).ln())
    }
}

/// Posterior over the hidden labels and the marginal log-likelihood
fn e_step(
    design: &DMatrix<f64>,
    labels: &AnnotatorLabels,
    params: &CrowdParams,
    skip_zeros: bool,
) -> (Vec<f64>, f64) {
    let n = design.nrows();
    let prior = design * classifier_theta(params);
    let expertise: Vec<DVector<f64>> = (0..labels.n_annotators())
        .map(|t| (design * annotator_theta(params, t)).map(sigmoid))
        .collect();

    let mut posterior = Vec::with_capacity(n);
    let mut log_likelihood = 0.0;
    for i in 0..n {
        let p1 = sigmoid(prior[i]);
        let mut log1 = log_factor(p1, skip_zeros).unwrap_or(0.0);
        let mut log0 = log_factor(1.0 - p1, skip_zeros).unwrap_or(0.0);

        for (t, eta) in expertise.iter().enumerate() {
            let (if_one, if_zero) = if labels.get(t, i) == 1 {
                (eta[i], 1.0 - eta[i])
            } else {
                (1.0 - eta[i], eta[i])
            };
            log1 += log_factor(if_one, skip_zeros).unwrap_or(0.0);
            log0 += log_factor(if_zero, skip_zeros).unwrap_or(0.0);
        }

        let top = log1.max(log0);
        log_likelihood += top + ((log1 - top).exp() + (log0 - top).exp()).ln();
        posterior.push(sigmoid(log1 - log0));
    }

    (posterior, log_likelihood)
}

fn m_step(
    solver: &LogisticFit<'_>,
    labels: &AnnotatorLabels,
    posterior: &[f64],
    current: &CrowdParams,
) -> CrowdParams {
    let n = posterior.len();
    let d = current.a.len();

    let mu = DVector::from_column_slice(posterior);
    let classifier = solver.fit(&mu, classifier_theta(current));

    let t_count = labels.n_annotators();
    let mut w = DMatrix::zeros(t_count, d);
    let mut g = DVector::zeros(t_count);
    for t in 0..t_count {
        let row = labels.row(t);
        let agreement = DVector::from_fn(n, |i, _| if row[i] == 1 { mu[i] } else { 1.0 - mu[i] });
        let theta = solver.fit(&agreement, annotator_theta(current, t));
        for j in 0..d {
            w[(t, j)] = theta[j];
        }
        g[t] = theta[d];
    }

    CrowdParams {
        a: classifier.rows(0, d).into_owned(),
        b: classifier[d],
        w,
        g,
    }
}

/// Largest absolute difference across every parameter
fn max_change(old: &CrowdParams, new: &CrowdParams) -> f64 {
    let a = (&old.a - &new.a).amax();
    let b = (old.b - new.b).abs();
    let w = (&old.w - &new.w).amax();
    let g = (&old.g - &new.g).amax();
    a.max(b).max(w).max(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// 1-d separable problem with `n_annotators` each flipping `flip` of labels
    fn line_problem(n: usize, n_annotators: usize, flip: f64, seed: u64) -> (DMatrix<f64>, Vec<u8>, AnnotatorLabels) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x = DMatrix::from_fn(n, 2, |i, j| {
            if j == 0 {
                (i as f64 - n as f64 / 2.0 + 0.5) / (n as f64 / 8.0)
            } else {
                standard_normal(&mut rng) * 0.1
            }
        });
        let truth: Vec<u8> = (0..n).map(|i| u8::from(x[(i, 0)] > 0.0)).collect();
        let rows = (0..n_annotators)
            .map(|_| {
                truth
                    .iter()
                    .map(|&z| if rng.random::<f64>() < flip { 1 - z } else { z })
                    .collect()
            })
            .collect();
        (x, truth, AnnotatorLabels::from_rows(rows).unwrap())
    }

    fn accuracy(a: &[u8], b: &[u8]) -> f64 {
        crate::annotators::agreement(a, b)
    }

    #[test]
    fn test_recovers_truth_from_noisy_annotators() {
        let (x, truth, labels) = line_problem(60, 9, 0.2, 1);
        let outcome = train_crowd(&x, &labels, &TrainOptions::default()).unwrap();
        assert!(accuracy(&outcome.consensus(), &truth) >= 0.9);
        let predictions = outcome.params.predict(&x).unwrap();
        assert!(accuracy(&predictions, &truth) >= 0.85);
        assert!(outcome.log_likelihood.is_finite());
        assert_eq!(outcome.posterior.len(), 60);
    }

    #[test]
    fn test_lr_init_and_skip_zeros_also_work() {
        let (x, truth, labels) = line_problem(60, 9, 0.2, 2);
        let options = TrainOptions {
            lr_init: true,
            skip_zeros: true,
            ..TrainOptions::default()
        };
        let outcome = train_crowd(&x, &labels, &options).unwrap();
        assert!(accuracy(&outcome.consensus(), &truth) >= 0.9);
        assert!(outcome.params.a.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_parameter_shapes() {
        let (x, _, labels) = line_problem(30, 4, 0.1, 3);
        let outcome = train_crowd(&x, &labels, &TrainOptions::default()).unwrap();
        assert_eq!(outcome.params.a.len(), 2);
        assert_eq!(outcome.params.w.shape(), (4, 2));
        assert_eq!(outcome.params.g.len(), 4);
        assert!(outcome.iterations >= 1);
    }

    #[test]
    fn test_better_annotator_gets_higher_expertise() {
        let (x, truth, _) = line_problem(80, 1, 0.0, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(40);
        let mut rows = Vec::new();
        for flip in [0.05, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3] {
            let k = crate::annotators::flip_count(truth.len(), flip);
            let mut row = truth.clone();
            for i in rand::seq::index::sample(&mut rng, truth.len(), k).into_iter() {
                row[i] = 1 - row[i];
            }
            rows.push(row);
        }
        let labels = AnnotatorLabels::from_rows(rows).unwrap();
        let outcome = train_crowd(&x, &labels, &TrainOptions::default()).unwrap();
        let eta = outcome.params.mean_expertise(&x).unwrap();
        let noisy = eta[1..].iter().sum::<f64>() / (eta.len() - 1) as f64;
        assert!(eta[0] > noisy, "careful {} vs noisy {}", eta[0], noisy);
    }

    #[test]
    fn test_single_iteration_cap_reports_not_converged() {
        let (x, _, labels) = line_problem(30, 5, 0.2, 5);
        let options = TrainOptions {
            max_iterations: 1,
            epsilon: 1e-12,
            ..TrainOptions::default()
        };
        let outcome = train_crowd(&x, &labels, &options).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.converged);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let x = DMatrix::zeros(5, 2);
        let labels = AnnotatorLabels::from_rows(vec![vec![0, 1, 0]]).unwrap();
        assert!(matches!(
            train_crowd(&x, &labels, &TrainOptions::default()),
            Err(CrowdError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_log_factor_skip_and_clamp() {
        assert_eq!(log_factor(0.0, true), None);
        assert_eq!(log_factor(0.0, false), Some(PROB_FLOOR.ln()));
        assert_eq!(log_factor(1.0, true), Some(0.0));
    }

    #[test]
    fn test_tuple_interface() {
        let (x, truth, labels) = line_problem(40, 7, 0.15, 6);
        let (a, b, w, g) = super::super::train(&x, &labels, false, false).unwrap();
        assert_eq!(w.nrows(), g.len());
        let predictions = super::super::predict(&a, b, &x).unwrap();
        assert!(accuracy(&predictions, &truth) >= 0.85);
    }
}
