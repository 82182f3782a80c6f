//! Utility functions for state vectors.
//!
//! This module contains helper functions for:
//! - Vector operations (tensor product, outer product, normalization).
//! - Turning raw projection weights into a sampling distribution.
//! - Drawing an outcome index from that distribution.

use crate::random::RandomSource;
use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;

/// Tolerance used when comparing norms and probabilities.
pub const TOLERANCE: f64 = 1e-12;

/// Computes the Kronecker (tensor) product of two state vectors.
///
/// If `a` has $m$ amplitudes and `b` has $p$, the result has $mp$ amplitudes
/// indexed as `i * p + j`, so the first factor is the most significant.
pub fn kronecker_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array1<Complex64> {
    let m = a.len();
    let p = b.len();

    // (m, 1) * (1, p) -> (m, p), then flatten row-major
    let a_column = a.view().insert_axis(Axis(1));
    let b_row = b.view().insert_axis(Axis(0));
    let product = &a_column * &b_row;

    let flat: Array1<Complex64> = product.iter().copied().collect();
    debug_assert_eq!(flat.len(), m * p);
    flat
}

/// Computes the outer product of two vectors $|a\rangle\langle b|$.
pub fn outer_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array2<Complex64> {
    let n = a.len();
    let m = b.len();
    let mut res = Array2::zeros((n, m));

    for i in 0..n {
        for j in 0..m {
            res[[i, j]] = a[i] * b[j].conj();
        }
    }
    res
}

/// Inner product $\langle a|b\rangle$.
pub fn inner_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Complex64 {
    a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
}

/// Sum of squared amplitude magnitudes.
pub fn norm_sqr(vector: &Array1<Complex64>) -> f64 {
    vector.iter().map(|c| c.norm_sqr()).sum()
}

/// Scales a vector to unit norm. A zero vector is returned unchanged.
pub fn normalize(vector: Array1<Complex64>) -> Array1<Complex64> {
    let norm = norm_sqr(&vector).sqrt();
    if norm > 0.0 {
        vector.mapv(|c| c / norm)
    } else {
        vector
    }
}

/// Clamps negative weights to zero and rescales them to sum to one.
///
/// When every weight vanishes the outcomes are treated as equally likely.
pub fn renormalize(weights: &[f64]) -> Vec<f64> {
    let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();

    if total > 0.0 {
        clamped.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / clamped.len() as f64; clamped.len()]
    }
}

/// Randomly selects an outcome index weighted by `probs`, consuming one
/// uniform draw.
pub fn pick_outcome<R: RandomSource + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    let roll = rng.uniform();

    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if roll < cumulative {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}
