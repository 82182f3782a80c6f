use crate::core::errors::StateError;
use crate::core::measurements::{Basis, MeasurementResult};
use crate::core::utils::{self, TOLERANCE, kronecker_product, pick_outcome, renormalize};
use crate::random::RandomSource;
use ndarray::{Array1, array};
use num_complex::Complex64;

/// Single-qubit pure state $\alpha|0\rangle + \beta|1\rangle$.
///
/// Measuring consumes the qubit and hands back the collapsed state, so a
/// pre-measurement state can never be measured twice.
#[derive(Clone, Debug, PartialEq)]
pub struct Qubit {
    amplitudes: Array1<Complex64>,
}

impl Qubit {
    /// Prepares the eigenvector of `Basis::at(angle)` selected by `bit`.
    pub fn prepare(bit: u8, angle: f64) -> Self {
        let basis = Basis::at(angle);
        Self {
            amplitudes: basis.eigenvector(bit).clone(),
        }
    }

    /// |0>
    pub fn zero() -> Self {
        Self {
            amplitudes: array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
        }
    }

    /// Creates a qubit from explicit amplitudes.
    pub fn from_amplitudes(amplitudes: Array1<Complex64>) -> Result<Self, StateError> {
        check_vector_state(&amplitudes, 2)?;
        Ok(Self { amplitudes })
    }

    pub fn amplitudes(&self) -> &Array1<Complex64> {
        &self.amplitudes
    }

    /// Outcome distribution for a measurement at `angle`.
    pub fn probabilities(&self, angle: f64) -> Vec<f64> {
        let basis = Basis::at(angle);
        let weights: Vec<f64> = basis
            .eigenvectors
            .iter()
            .map(|e| utils::inner_product(e, &self.amplitudes).norm_sqr())
            .collect();
        renormalize(&weights)
    }

    /// Projective measurement at `angle`; the state collapses onto the
    /// eigenvector of the observed outcome.
    pub fn measure<R: RandomSource + ?Sized>(
        self,
        angle: f64,
        rng: &mut R,
    ) -> MeasurementResult<Qubit> {
        let probs = self.probabilities(angle);
        let outcome = pick_outcome(&probs, rng) as u8;

        MeasurementResult {
            outcome,
            state: Qubit::prepare(outcome, angle),
        }
    }
}

/// Which half of an entangled pair a local operation acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Two-qubit pure state, amplitudes indexed as `2 * a + b`.
#[derive(Clone, Debug, PartialEq)]
pub struct EntangledPair {
    amplitudes: Array1<Complex64>,
}

impl EntangledPair {
    /// Bell state $(|00\rangle + |11\rangle)/\sqrt{2}$.
    pub fn bell() -> Self {
        let h = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        Self {
            amplitudes: array![h, zero, zero, h],
        }
    }

    /// Uncorrelated pair $|a\rangle \otimes |b\rangle$.
    pub fn product(a: &Qubit, b: &Qubit) -> Self {
        Self {
            amplitudes: kronecker_product(&a.amplitudes, &b.amplitudes),
        }
    }

    pub fn from_amplitudes(amplitudes: Array1<Complex64>) -> Result<Self, StateError> {
        check_vector_state(&amplitudes, 4)?;
        Ok(Self { amplitudes })
    }

    pub fn amplitudes(&self) -> &Array1<Complex64> {
        &self.amplitudes
    }

    /// Contracts `side` with $\langle v|$, leaving the other side's
    /// (unnormalized) amplitudes.
    fn contract(&self, side: Side, v: &Array1<Complex64>) -> Array1<Complex64> {
        let psi = &self.amplitudes;
        let mut out = Array1::<Complex64>::zeros(2);
        for a in 0..2 {
            for b in 0..2 {
                let amp = psi[2 * a + b];
                match side {
                    Side::A => out[b] += v[a].conj() * amp,
                    Side::B => out[a] += v[b].conj() * amp,
                }
            }
        }
        out
    }

    /// Outcome distribution for a local measurement of `side` at `angle`.
    pub fn probabilities(&self, side: Side, angle: f64) -> Vec<f64> {
        let basis = Basis::at(angle);
        let weights: Vec<f64> = basis
            .eigenvectors
            .iter()
            .map(|e| utils::norm_sqr(&self.contract(side, e)))
            .collect();
        renormalize(&weights)
    }

    /// Local projective measurement of one side.
    ///
    /// The joint state collapses to $|e_k\rangle \otimes |\phi\rangle$ and the
    /// pair is consumed; the result carries $|\phi\rangle$, the state left for
    /// whoever holds the other side.
    pub fn measure<R: RandomSource + ?Sized>(
        self,
        side: Side,
        angle: f64,
        rng: &mut R,
    ) -> MeasurementResult<Qubit> {
        let basis = Basis::at(angle);
        let probs = self.probabilities(side, angle);
        let outcome = pick_outcome(&probs, rng) as u8;

        let remaining = utils::normalize(self.contract(side, basis.eigenvector(outcome)));

        MeasurementResult {
            outcome,
            state: Qubit {
                amplitudes: remaining,
            },
        }
    }
}

/// Validates that the input vector is a normalized state of `dim` amplitudes.
fn check_vector_state(vector: &Array1<Complex64>, dim: usize) -> Result<(), StateError> {
    if vector.len() != dim {
        return Err(StateError::InvalidDimensions {
            expected: dim,
            got: vector.len(),
        });
    }

    let norm_sqr = utils::norm_sqr(vector);
    if (norm_sqr - 1.0).abs() > TOLERANCE {
        return Err(StateError::NotNormalized(norm_sqr));
    }

    Ok(())
}
