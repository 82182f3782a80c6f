//! E91 (Ekert) Quantum Key Distribution Protocol.
//!
//! A source distributes Bell pairs $(|00\rangle + |11\rangle)/\sqrt{2}$. Alice
//! and Bob measure their halves at independently chosen angles. Positions
//! where both measured at the key angle form the key; every position feeds a
//! CHSH test, and only a Bell violation ($S > 2$) certifies that the pairs
//! arrived undisturbed.

use crate::cipher::{KeyMaterial, Reconciliation, pack_bits};
use crate::config::{self, E91Config};
use crate::core::errors::{ConfigError, ProtocolError};
use crate::core::{EntangledPair, Qubit, Side};
use crate::protocols::{KeyDistribution, Protocol, Stage};
use crate::random::{self, Mt19937, RandomSource};
use tracing::{debug, info, warn};

/// Angle (degrees) both parties must use for a position to become key.
pub const KEY_ANGLE: f64 = 0.0;

/// Classical bound of the CHSH expression.
pub const CLASSICAL_BOUND: f64 = 2.0;

/// Statistics gathered while reconciling an E91 session.
#[derive(Debug, Clone, PartialEq)]
pub struct E91Report {
    pub raw_length: usize,
    /// Positions measured at the key angle on both sides
    pub key_events: usize,
    /// E(a0,b0), E(a0,b1), E(a1,b0), E(a1,b1)
    pub correlations: [f64; 4],
    pub chsh: f64,
}

/// Maps an outcome bit to the eigenvalue sign used in correlations.
fn spin(bit: u8) -> f64 {
    if bit == 0 { 1.0 } else { -1.0 }
}

#[derive(Debug, Clone)]
pub struct E91 {
    config: E91Config,
    rng: Mt19937,
    stage: Stage,
    pairs: Vec<EntangledPair>,
    alice_angles: Vec<f64>,
    bob_angles: Vec<f64>,
    eve_angles: Vec<f64>,
    alice_bits: Vec<u8>,
    bob_bits: Vec<u8>,
    eve_bits: Vec<u8>,
    outcome: Option<Reconciliation>,
    report: Option<E91Report>,
    material: KeyMaterial,
}

impl E91 {
    /// Creates an idle engine, rejecting options that fail validation.
    pub fn new(config: E91Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: random::entropy_seeded(),
            stage: Stage::Idle,
            pairs: Vec::new(),
            alice_angles: Vec::new(),
            bob_angles: Vec::new(),
            eve_angles: Vec::new(),
            alice_bits: Vec::new(),
            bob_bits: Vec::new(),
            eve_bits: Vec::new(),
            outcome: None,
            report: None,
            material: KeyMaterial::default(),
        })
    }

    pub fn config(&self) -> &E91Config {
        &self.config
    }

    pub fn report(&self) -> Option<&E91Report> {
        self.report.as_ref()
    }

    pub fn bob_raw(&self) -> (&[u8], &[f64]) {
        (&self.bob_bits, &self.bob_angles)
    }

    pub fn eve_raw(&self) -> (&[u8], &[f64]) {
        (&self.eve_bits, &self.eve_angles)
    }

    fn reset(&mut self) {
        self.pairs.clear();
        self.eve_angles.clear();
        self.alice_bits.clear();
        self.bob_bits.clear();
        self.eve_bits.clear();
        self.outcome = None;
        self.report = None;
        self.material = KeyMaterial::default();
    }

    /// Mean product of mapped outcomes over positions measured at `(a, b)`;
    /// zero when no position used that pair.
    pub fn correlation(&self, a: f64, b: f64) -> f64 {
        let products: Vec<f64> = (0..self.alice_bits.len())
            .filter(|&i| self.alice_angles[i] == a && self.bob_angles[i] == b)
            .map(|i| spin(self.alice_bits[i]) * spin(self.bob_bits[i]))
            .collect();

        if products.is_empty() {
            0.0
        } else {
            products.iter().sum::<f64>() / products.len() as f64
        }
    }

    /// $S = |E(a_0,b_0) - E(a_0,b_1) + E(a_1,b_0) + E(a_1,b_1)|$
    fn chsh(&self) -> ([f64; 4], f64) {
        let [a0, a1] = self.config.chsh_a;
        let [b0, b1] = self.config.chsh_b;
        let correlations = [
            self.correlation(a0, b0),
            self.correlation(a0, b1),
            self.correlation(a1, b0),
            self.correlation(a1, b1),
        ];
        let [e00, e01, e10, e11] = correlations;
        (correlations, (e00 - e01 + e10 + e11).abs())
    }

    fn settle(&mut self, outcome: Reconciliation, key_bits: &[u8]) -> Reconciliation {
        self.material = KeyMaterial::reconciled(&outcome, pack_bits(key_bits));
        self.outcome = Some(outcome);
        self.stage = Stage::Reconciled;
        outcome
    }
}

impl KeyDistribution for E91 {
    fn protocol(&self) -> Protocol {
        Protocol::E91
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    /// Measurement angles are fixed up front; they do not influence how the
    /// pairs are prepared.
    fn generate_key(&mut self, seed: Option<u32>) {
        if let Some(seed) = seed {
            self.rng.reseed(seed);
        }
        self.reset();

        let length = self.config.key_length;
        self.alice_angles = self.rng.choose_many(&self.config.basis_a, length);
        self.bob_angles = self.rng.choose_many(&self.config.basis_b, length);
        self.pairs = (0..length).map(|_| EntangledPair::bell()).collect();
        self.stage = Stage::Generated;

        debug!(length, "E91 pairs prepared");
    }

    fn send_key(&mut self, eavesdropping: bool, seed: Option<u32>) -> Result<(), ProtocolError> {
        self.stage.require(Stage::Generated, "send key")?;
        if let Some(seed) = seed {
            self.rng.reseed(seed);
        }

        let pairs = std::mem::take(&mut self.pairs);
        for (i, pair) in pairs.into_iter().enumerate() {
            let alice_angle = self.alice_angles[i];

            if eavesdropping {
                let eve_angle = self
                    .rng
                    .choose(&self.config.basis_e)
                    .ok_or_else(|| config::invalid("BASIS_E", "at least one angle is required"))?;
                let alice = pair.measure(Side::A, alice_angle, &mut self.rng);
                // Eve measures Bob's half and forwards a qubit encoding her
                // result, so Bob records her outcome.
                let eve = alice.state.measure(eve_angle, &mut self.rng);
                self.alice_bits.push(alice.outcome);
                self.eve_angles.push(eve_angle);
                self.eve_bits.push(eve.outcome);
                self.bob_bits.push(eve.outcome);
            } else {
                let alice = pair.measure(Side::A, alice_angle, &mut self.rng);
                // Bob's half is paired with a |0> ancilla and measured as side B
                let bob = EntangledPair::product(&Qubit::zero(), &alice.state).measure(
                    Side::B,
                    self.bob_angles[i],
                    &mut self.rng,
                );
                self.alice_bits.push(alice.outcome);
                self.bob_bits.push(bob.outcome);
            }
        }
        self.stage = Stage::Transmitted;

        debug!(eavesdropping, "E91 pairs measured");
        Ok(())
    }

    fn reconcile_key(&mut self) -> Result<Reconciliation, ProtocolError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }
        self.stage.require(Stage::Transmitted, "reconcile key")?;

        let key_bits: Vec<u8> = (0..self.alice_bits.len())
            .filter(|&i| self.alice_angles[i] == KEY_ANGLE && self.bob_angles[i] == KEY_ANGLE)
            .map(|i| self.alice_bits[i])
            .collect();

        if key_bits.is_empty() {
            warn!("E91 session produced no key events, session compromised");
            return Ok(self.settle(Reconciliation::compromised(), &[]));
        }

        let (correlations, chsh) = self.chsh();
        self.report = Some(E91Report {
            raw_length: self.alice_bits.len(),
            key_events: key_bits.len(),
            correlations,
            chsh,
        });

        let outcome = if chsh <= CLASSICAL_BOUND {
            warn!(chsh, "E91 Bell inequality not violated, session compromised");
            Reconciliation::compromised().with_chsh(chsh)
        } else {
            info!(chsh, key_length = key_bits.len(), "E91 key accepted");
            Reconciliation::accepted().with_chsh(chsh)
        };

        Ok(self.settle(outcome, &key_bits))
    }

    fn key_material(&self) -> &KeyMaterial {
        &self.material
    }
}
