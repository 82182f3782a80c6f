//! Injectable randomness for protocol sessions.
//!
//! Every stochastic step of a session (bit choice, basis choice, measurement
//! collapse, subset sacrifice) draws from a generator owned by that session.
//! The default generator is a 32-bit Mersenne Twister whose seeding and
//! derived draws follow NumPy's legacy `RandomState`, so a seeded session
//! reproduces the exact bit streams of the reference simulations.

use rand::{Rng, RngCore};

/// 32-bit Mersenne Twister (MT19937) seeded with `init_genrand`.
pub type Mt19937 = rand_mt::Mt;

/// Seeds a generator from the thread-local OS-backed RNG.
pub fn entropy_seeded() -> Mt19937 {
    Mt19937::new(rand::rng().random())
}

/// Smallest all-ones bit mask covering `max`.
fn covering_mask(max: u32) -> u32 {
    let mut mask = max;
    mask |= mask >> 1;
    mask |= mask >> 2;
    mask |= mask >> 4;
    mask |= mask >> 8;
    mask |= mask >> 16;
    mask
}

/// Derived draws used by the protocol engines.
///
/// Blanket-implemented for every [`RngCore`], so tests and callers can inject
/// any `rand` generator. With [`Mt19937`] the draws match NumPy's legacy
/// `random_sample`, masked `randint`, `choice` and `permutation`.
pub trait RandomSource: RngCore {
    /// Uniform double in `[0, 1)` with 53 bits of precision.
    fn uniform(&mut self) -> f64 {
        let a = f64::from(self.next_u32() >> 5);
        let b = f64::from(self.next_u32() >> 6);
        (a * 67_108_864.0 + b) / 9_007_199_254_740_992.0
    }

    /// Uniform integer in `[0, max]` by masked rejection.
    fn bounded(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        let mask = covering_mask(max);
        loop {
            let value = self.next_u32() & mask;
            if value <= max {
                return value;
            }
        }
    }

    /// Picks one element uniformly, or `None` if `items` is empty.
    fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        let last = items.len().checked_sub(1)?;
        Some(items[self.bounded(last as u32) as usize])
    }

    /// Picks `count` elements uniformly with replacement.
    ///
    /// Returns an empty vector when `items` is empty.
    fn choose_many<T: Copy>(&mut self, items: &[T], count: usize) -> Vec<T> {
        (0..count).map_while(|_| self.choose(items)).collect()
    }

    /// Draws `count` uniform bits, one byte of a buffered word per bit.
    fn random_bits(&mut self, count: usize) -> Vec<u8> {
        let mut bits = Vec::with_capacity(count);
        let mut buffer = 0u32;
        let mut remaining = 0u8;

        for _ in 0..count {
            if remaining == 0 {
                buffer = self.next_u32();
                remaining = 3;
            } else {
                buffer >>= 8;
                remaining -= 1;
            }
            bits.push((buffer & 1) as u8);
        }

        bits
    }

    /// Random permutation of `0..len` (Fisher-Yates from the back).
    fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut items: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = self.bounded(i as u32) as usize;
            items.swap(i, j);
        }
        items
    }

    /// `count` distinct indices drawn from `0..len`.
    fn sample_without_replacement(&mut self, len: usize, count: usize) -> Vec<usize> {
        let mut indices = self.permutation(len);
        indices.truncate(count.min(len));
        indices
    }
}

impl<R: RngCore + ?Sized> RandomSource for R {}
