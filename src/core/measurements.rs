use ndarray::{Array1, array};
use num_complex::Complex64;

/// Projective measurement basis defined by an angle in degrees.
///
/// The basis is the eigenbasis of the observable $\cos\theta X + \sin\theta Z$.
/// Eigenvectors are ordered by ascending eigenvalue, so outcome `0` is the
/// $-1$ eigenvector and outcome `1` the $+1$ eigenvector.
#[derive(Clone, Debug, PartialEq)]
pub struct Basis {
    /// Measurement direction in degrees
    pub angle: f64,
    /// Eigenvectors indexed by outcome
    pub eigenvectors: [Array1<Complex64>; 2],
}

impl Basis {
    pub fn at(angle: f64) -> Self {
        // Observable is a reflection about the axis at alpha = (90 - theta) / 2
        let alpha = ((90.0 - angle) / 2.0).to_radians();
        let (sin_a, cos_a) = alpha.sin_cos();

        let minus: Array1<Complex64> = array![Complex64::new(-sin_a, 0.0), Complex64::new(cos_a, 0.0)];
        let plus: Array1<Complex64> = array![Complex64::new(cos_a, 0.0), Complex64::new(sin_a, 0.0)];

        Self {
            angle,
            eigenvectors: [minus, plus],
        }
    }

    /// Eigenvalue associated with an outcome.
    pub fn eigenvalue(outcome: u8) -> f64 {
        if outcome == 0 { -1.0 } else { 1.0 }
    }

    pub fn eigenvector(&self, outcome: u8) -> &Array1<Complex64> {
        &self.eigenvectors[usize::from(outcome & 1)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementResult<T> {
    /// Observed outcome bit
    pub outcome: u8,
    /// Post-measurement state
    pub state: T,
}
