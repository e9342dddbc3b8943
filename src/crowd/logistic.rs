//! Logistic regression with soft targets
//!
//! Both halves of the M-step reduce to maximising
//! `sum_i c_i ln s(x_i) + (1 - c_i) ln(1 - s(x_i))` for targets `c_i` in
//! [0, 1], where `s` is a sigmoid of a linear score. This module solves that
//! problem with plain Newton steps (IRLS).
//!
//! Parameter vectors are laid out as `[weights.., bias]`.

use nalgebra::{DMatrix, DVector};

/// Numerically stable logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Append a column of ones so the bias is the last coefficient
pub fn augment(features: &DMatrix<f64>) -> DMatrix<f64> {
    let (n, d) = features.shape();
    DMatrix::from_fn(n, d + 1, |i, j| if j < d { features[(i, j)] } else { 1.0 })
}

/// Newton solver over a fixed augmented design matrix
#[derive(Debug, Clone)]
pub struct LogisticFit<'a> {
    design: &'a DMatrix<f64>,
    /// Ridge on the weights; the bias is left unpenalised
    l2: f64,
    max_steps: usize,
}

/// Stop once no coefficient moves more than this in one Newton step
const STEP_TOLERANCE: f64 = 1e-10;

/// Keeps the Hessian invertible when a column is constant
const JITTER: f64 = 1e-9;

impl<'a> LogisticFit<'a> {
    pub fn new(design: &'a DMatrix<f64>, l2: f64, max_steps: usize) -> Self {
        Self {
            design,
            l2,
            max_steps,
        }
    }

    /// Linear scores `design * theta`
    pub fn scores(&self, theta: &DVector<f64>) -> DVector<f64> {
        self.design * theta
    }

    /// Maximise the penalised soft-target log-likelihood starting at `theta`
    pub fn fit(&self, targets: &DVector<f64>, mut theta: DVector<f64>) -> DVector<f64> {
        let (n, k) = self.design.shape();
        let bias = k - 1;

        for _ in 0..self.max_steps {
            let probs = self.scores(&theta).map(sigmoid);
            let residual = targets - &probs;

            let mut gradient = self.design.transpose() * &residual;
            for j in 0..bias {
                gradient[j] -= self.l2 * theta[j];
            }

            let weighted = DMatrix::from_fn(n, k, |i, j| {
                self.design[(i, j)] * probs[i] * (1.0 - probs[i])
            });
            let mut hessian = self.design.transpose() * weighted;
            for j in 0..k {
                hessian[(j, j)] += if j == bias { JITTER } else { self.l2 + JITTER };
            }

            let step = match solve(hessian, &gradient) {
                Some(step) if step.iter().all(|v| v.is_finite()) => step,
                _ => break,
            };
            theta += &step;

            if step.amax() < STEP_TOLERANCE {
                break;
            }
        }

        theta
    }
}

/// Solve `hessian * x = rhs`, preferring Cholesky
fn solve(hessian: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    match hessian.clone().cholesky() {
        Some(chol) => Some(chol.solve(rhs)),
        None => hessian.lu().solve(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_is_stable_and_symmetric() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!(sigmoid(-745.0) >= 0.0);
    }

    #[test]
    fn test_augment_appends_ones() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let a = augment(&x);
        assert_eq!(a.shape(), (2, 3));
        assert_eq!(a[(0, 2)], 1.0);
        assert_eq!(a[(1, 1)], 4.0);
    }

    #[test]
    fn test_constant_targets_fit_bias_only() {
        let x = DMatrix::from_column_slice(6, 1, &[-2.0, -1.0, 0.0, 1.0, 2.0, 3.0]);
        let design = augment(&x);
        let fit = LogisticFit::new(&design, 0.01, 100);
        let targets = DVector::from_element(6, 0.8);
        let theta = fit.fit(&targets, DVector::zeros(2));
        let mean: f64 = fit.scores(&theta).map(sigmoid).mean();
        // Unpenalised bias: mean prediction matches mean target
        assert!((mean - 0.8).abs() < 1e-6, "mean {}", mean);
    }

    #[test]
    fn test_separable_labels_get_right_sign() {
        let x = DMatrix::from_column_slice(8, 1, &[-4.0, -3.0, -2.0, -1.0, 1.0, 2.0, 3.0, 4.0]);
        let design = augment(&x);
        let fit = LogisticFit::new(&design, 0.1, 100);
        let targets = DVector::from_column_slice(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let theta = fit.fit(&targets, DVector::zeros(2));
        assert!(theta[0] > 0.0);
        assert!(theta.iter().all(|v| v.is_finite()));
        let probs = fit.scores(&theta).map(sigmoid);
        assert!(probs[0] < 0.5 && probs[7] > 0.5);
    }

    #[test]
    fn test_soft_targets_match_unpenalised_mean() {
        let x = DMatrix::from_column_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let design = augment(&x);
        let fit = LogisticFit::new(&design, 0.0, 200);
        let targets = DVector::from_column_slice(&[0.2, 0.4, 0.6, 0.8]);
        let theta = fit.fit(&targets, DVector::zeros(2));
        let probs = fit.scores(&theta).map(sigmoid);
        assert!((probs.sum() - targets.sum()).abs() < 1e-6);
        assert!(probs[0] < probs[3]);
    }
}
