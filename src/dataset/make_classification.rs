//! Gaussian-cluster classification generator
//!
//! Each class is a union of Gaussian clusters centred on distinct vertices
//! of a hypercube with side `2 * class_sep` in the informative subspace.
//! Every cluster gets its own random linear covariance. Redundant features
//! are random linear combinations of the informative ones and the remaining
//! features are pure noise. A small `flip_y` fraction of labels is redrawn
//! at random and finally rows and columns are shuffled.

use super::Dataset;
use crate::config::DatasetConfig;
use crate::error::{CrowdError, CrowdResult};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use tracing::debug;

const N_CLASSES: usize = 2;

/// Generate a dataset from the configured seed
pub fn make_classification(config: &DatasetConfig) -> CrowdResult<Dataset> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    make_classification_with_rng(config, &mut rng)
}

/// Generate a dataset drawing from a caller-supplied RNG
pub fn make_classification_with_rng<R: Rng + ?Sized>(
    config: &DatasetConfig,
    rng: &mut R,
) -> CrowdResult<Dataset> {
    let n = config.n_samples;
    let n_inf = config.n_informative;
    let n_red = config.n_redundant;
    let n_features = config.n_features;

    if n == 0 {
        return Err(CrowdError::EmptyDataset("n_samples is 0".into()));
    }
    if n_inf == 0 || n_inf + n_red > n_features {
        return Err(CrowdError::InvalidConfig(format!(
            "cannot fit {} informative + {} redundant features into {}",
            n_inf, n_red, n_features
        )));
    }
    if config.n_clusters_per_class == 0 {
        return Err(CrowdError::InvalidConfig(
            "n_clusters_per_class must be at least 1".into(),
        ));
    }
    if !config.class_sep.is_finite() {
        return Err(CrowdError::InvalidConfig(format!(
            "class_sep must be finite, got {}",
            config.class_sep
        )));
    }

    let n_clusters = N_CLASSES * config.n_clusters_per_class;
    let centroids = hypercube_vertices(n_inf, n_clusters, config.class_sep, rng)?;

    let mut informative = DMatrix::from_fn(n, n_inf, |_, _| standard_normal(&mut *rng));
    let mut labels = vec![0u8; n];

    let base = n / n_clusters;
    let extra = n % n_clusters;
    let mut start = 0;
    for (k, centroid) in centroids.iter().enumerate() {
        let len = base + usize::from(k < extra);
        if len == 0 {
            continue;
        }
        let covariance = DMatrix::from_fn(n_inf, n_inf, |_, _| rng.random_range(-1.0..1.0f64));
        let mixed = informative.rows(start, len).clone_owned() * covariance;
        informative.rows_mut(start, len).copy_from(&mixed);
        for r in start..start + len {
            for (j, c) in centroid.iter().enumerate() {
                informative[(r, j)] += c;
            }
            labels[r] = (k % N_CLASSES) as u8;
        }
        start += len;
    }

    let mut raw = DMatrix::<f64>::zeros(n, n_features);
    raw.columns_mut(0, n_inf).copy_from(&informative);
    if n_red > 0 {
        let mixing = DMatrix::from_fn(n_inf, n_red, |_, _| rng.random_range(-1.0..1.0f64));
        let redundant = &informative * mixing;
        raw.columns_mut(n_inf, n_red).copy_from(&redundant);
    }
    for j in n_inf + n_red..n_features {
        for i in 0..n {
            raw[(i, j)] = standard_normal(rng);
        }
    }

    let mut flipped = 0;
    if config.flip_y > 0.0 {
        for label in labels.iter_mut() {
            if rng.random::<f64>() < config.flip_y {
                *label = rng.random_range(0..N_CLASSES) as u8;
                flipped += 1;
            }
        }
    }

    let mut row_order: Vec<usize> = (0..n).collect();
    row_order.shuffle(rng);
    let mut col_order: Vec<usize> = (0..n_features).collect();
    col_order.shuffle(rng);

    let features = DMatrix::from_fn(n, n_features, |i, j| raw[(row_order[i], col_order[j])]);
    let labels = row_order.iter().map(|&i| labels[i]).collect();

    debug!(
        "Generated {} samples x {} features ({} clusters, {} labels redrawn)",
        n, n_features, n_clusters, flipped
    );

    Dataset::new(features, labels)
}

/// Pick `count` distinct hypercube vertices scaled to `[-class_sep, class_sep]`
fn hypercube_vertices<R: Rng + ?Sized>(
    dims: usize,
    count: usize,
    class_sep: f64,
    rng: &mut R,
) -> CrowdResult<Vec<Vec<f64>>> {
    let available = 2u128.checked_pow(dims as u32).unwrap_or(u128::MAX);
    if count as u128 > available {
        return Err(CrowdError::InvalidConfig(format!(
            "{} clusters do not fit on the {} vertices of a {}-d hypercube",
            count, available, dims
        )));
    }

    let mut chosen: Vec<Vec<bool>> = Vec::with_capacity(count);
    while chosen.len() < count {
        let vertex: Vec<bool> = (0..dims).map(|_| rng.random_bool(0.5)).collect();
        if !chosen.contains(&vertex) {
            chosen.push(vertex);
        }
    }

    Ok(chosen
        .into_iter()
        .map(|v| {
            v.into_iter()
                .map(|bit| if bit { class_sep } else { -class_sep })
                .collect()
        })
        .collect())
}

/// Box-Muller draw from N(0, 1)
pub(crate) fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - U keeps the log argument in (0, 1]
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
