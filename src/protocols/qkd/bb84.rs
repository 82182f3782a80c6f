//! BB84 Quantum Key Distribution Protocol.
//!
//! Alice encodes random bits in randomly chosen bases, Bob measures in his own
//! random bases, and both keep the positions where the bases agree. A random
//! sample of that sifted key is disclosed to estimate the quantum bit error
//! rate; an intercept-resend attacker pushes it towards 25%.

use crate::cipher::{KeyMaterial, Reconciliation, pack_bits};
use crate::config::{self, Bb84Config};
use crate::core::Qubit;
use crate::core::errors::{ConfigError, ProtocolError};
use crate::protocols::{KeyDistribution, Protocol, Stage};
use crate::random::{self, Mt19937, RandomSource};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Statistics gathered while reconciling a BB84 session.
#[derive(Debug, Clone, PartialEq)]
pub struct Bb84Report {
    /// Number of transmitted qubits.
    pub raw_length: usize,
    /// Positions where Alice's and Bob's bases matched.
    pub sifted_length: usize,
    /// Sifted bits disclosed for the error estimate.
    pub sacrificed: usize,
    /// Mismatches among the disclosed bits.
    pub check_errors: usize,
    /// Error rate on the disclosed bits.
    pub qber: f64,
    /// Mismatches over the whole sifted key.
    pub sifted_errors: usize,
    /// Bits kept as key material.
    pub key_length: usize,
}

impl Bb84Report {
    /// Error rate over every basis-matched position.
    pub fn sifted_error_rate(&self) -> f64 {
        if self.sifted_length == 0 {
            0.0
        } else {
            self.sifted_errors as f64 / self.sifted_length as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bb84 {
    config: Bb84Config,
    rng: Mt19937,
    stage: Stage,
    alice_bits: Vec<u8>,
    alice_angles: Vec<f64>,
    /// Qubits prepared by Alice, not yet sent
    prepared: Vec<Qubit>,
    /// Qubits waiting at Bob's detector
    received: Vec<Qubit>,
    eve_bits: Vec<u8>,
    eve_angles: Vec<f64>,
    bob_bits: Vec<u8>,
    bob_angles: Vec<f64>,
    outcome: Option<Reconciliation>,
    report: Option<Bb84Report>,
    material: KeyMaterial,
}

impl Bb84 {
    /// Creates an idle engine, rejecting options that fail validation.
    pub fn new(config: Bb84Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: random::entropy_seeded(),
            stage: Stage::Idle,
            alice_bits: Vec::new(),
            alice_angles: Vec::new(),
            prepared: Vec::new(),
            received: Vec::new(),
            eve_bits: Vec::new(),
            eve_angles: Vec::new(),
            bob_bits: Vec::new(),
            bob_angles: Vec::new(),
            outcome: None,
            report: None,
            material: KeyMaterial::default(),
        })
    }

    pub fn config(&self) -> &Bb84Config {
        &self.config
    }

    /// Reconciliation statistics, once available.
    pub fn report(&self) -> Option<&Bb84Report> {
        self.report.as_ref()
    }

    /// Interceptor's observations; empty without eavesdropping.
    pub fn eve_raw(&self) -> (&[u8], &[f64]) {
        (&self.eve_bits, &self.eve_angles)
    }

    fn reset(&mut self) {
        self.prepared.clear();
        self.received.clear();
        self.eve_bits.clear();
        self.eve_angles.clear();
        self.bob_bits.clear();
        self.bob_angles.clear();
        self.outcome = None;
        self.report = None;
        self.material = KeyMaterial::default();
    }

    /// Bob measures every received qubit in a freshly chosen basis.
    fn measure_received(&mut self) {
        let length = self.received.len();
        self.bob_angles = self.rng.choose_many(&self.config.basis, length);

        let received = std::mem::take(&mut self.received);
        self.bob_bits = received
            .into_iter()
            .zip(&self.bob_angles)
            .map(|(qubit, &angle)| qubit.measure(angle, &mut self.rng).outcome)
            .collect();
    }

    fn settle(&mut self, outcome: Reconciliation, key_bits: &[u8]) -> Reconciliation {
        self.material = KeyMaterial::reconciled(&outcome, pack_bits(key_bits));
        self.outcome = Some(outcome);
        self.stage = Stage::Reconciled;
        outcome
    }
}

impl KeyDistribution for Bb84 {
    fn protocol(&self) -> Protocol {
        Protocol::Bb84
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn generate_key(&mut self, seed: Option<u32>) {
        if let Some(seed) = seed {
            self.rng.reseed(seed);
        }
        self.reset();

        let length = self.config.key_length;
        self.alice_bits = self.rng.random_bits(length);
        self.alice_angles = self.rng.choose_many(&self.config.basis, length);
        self.prepared = self
            .alice_bits
            .iter()
            .zip(&self.alice_angles)
            .map(|(&bit, &angle)| Qubit::prepare(bit, angle))
            .collect();
        self.stage = Stage::Generated;

        debug!(length, "BB84 qubits prepared");
    }

    fn send_key(&mut self, eavesdropping: bool, seed: Option<u32>) -> Result<(), ProtocolError> {
        self.stage.require(Stage::Generated, "send key")?;
        if let Some(seed) = seed {
            self.rng.reseed(seed);
        }

        let in_flight = std::mem::take(&mut self.prepared);
        self.received = if eavesdropping {
            // Intercept-resend: Eve measures in a random basis and forwards
            // the eigenstate she observed.
            let mut forwarded = Vec::with_capacity(in_flight.len());
            for qubit in in_flight {
                let angle = self
                    .rng
                    .choose(&self.config.basis)
                    .ok_or_else(|| config::invalid("BASIS", "at least one angle is required"))?;
                let seen = qubit.measure(angle, &mut self.rng);
                self.eve_bits.push(seen.outcome);
                self.eve_angles.push(angle);
                forwarded.push(seen.state);
            }
            forwarded
        } else {
            in_flight
        };
        self.stage = Stage::Transmitted;

        debug!(eavesdropping, "BB84 qubits transmitted");
        Ok(())
    }

    fn reconcile_key(&mut self) -> Result<Reconciliation, ProtocolError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }
        self.stage.require(Stage::Transmitted, "reconcile key")?;

        self.measure_received();

        let sifted: Vec<usize> = (0..self.alice_angles.len())
            .filter(|&i| self.alice_angles[i] == self.bob_angles[i])
            .collect();
        let mismatch = |i: usize| self.alice_bits[i] != self.bob_bits[i];
        let sifted_errors = sifted.iter().filter(|&&i| mismatch(i)).count();

        if sifted.is_empty() {
            warn!("BB84 sifting left no positions, session compromised");
            self.report = Some(Bb84Report {
                raw_length: self.alice_bits.len(),
                sifted_length: 0,
                sacrificed: 0,
                check_errors: 0,
                qber: 0.0,
                sifted_errors: 0,
                key_length: 0,
            });
            return Ok(self.settle(Reconciliation::compromised(), &[]));
        }

        let sample_size = self.config.reconciliation_subset.min(sifted.len());
        let sacrificed: HashSet<usize> = self
            .rng
            .sample_without_replacement(sifted.len(), sample_size)
            .into_iter()
            .map(|k| sifted[k])
            .collect();

        let check_errors = sacrificed.iter().filter(|&&i| mismatch(i)).count();
        let qber = if sample_size > 0 {
            check_errors as f64 / sample_size as f64
        } else {
            0.0
        };

        let key_bits: Vec<u8> = sifted
            .iter()
            .filter(|i| !sacrificed.contains(*i))
            .map(|&i| self.alice_bits[i])
            .collect();

        self.report = Some(Bb84Report {
            raw_length: self.alice_bits.len(),
            sifted_length: sifted.len(),
            sacrificed: sample_size,
            check_errors,
            qber,
            sifted_errors,
            key_length: key_bits.len(),
        });

        // Strict comparison: an error rate equal to the threshold is rejected
        let outcome = if qber < self.config.qber {
            info!(qber, key_length = key_bits.len(), "BB84 key accepted");
            Reconciliation::accepted().with_qber(qber)
        } else {
            warn!(qber, threshold = self.config.qber, "BB84 session compromised");
            Reconciliation::compromised().with_qber(qber)
        };

        Ok(self.settle(outcome, &key_bits))
    }

    fn key_material(&self) -> &KeyMaterial {
        &self.material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::CipherError;

    fn engine(key_length: usize) -> Bb84 {
        Bb84::new(Bb84Config {
            key_length,
            ..Bb84Config::default()
        })
        .unwrap()
    }

    fn run(bb84: &mut Bb84, eavesdropping: bool, seed: u32) -> Reconciliation {
        bb84.generate_key(Some(seed));
        bb84.send_key(eavesdropping, None).unwrap();
        bb84.reconcile_key().unwrap()
    }

    #[test]
    fn rejects_invalid_options() {
        let empty = Bb84::new(Bb84Config {
            basis: Vec::new(),
            ..Bb84Config::default()
        });
        assert!(matches!(empty, Err(ConfigError::Invalid { field: "BASIS", .. })));
        assert!(Bb84::new(Bb84Config {
            key_length: 0,
            ..Bb84Config::default()
        })
        .is_err());
    }

    #[test]
    fn generation_alone_gives_no_key() {
        let mut bb84 = engine(256);
        bb84.generate_key(Some(71107));
        assert!(!bb84.is_key_valid());
        assert_eq!(bb84.stage(), Stage::Generated);
    }

    #[test]
    fn undisturbed_channel_is_never_compromised() {
        let mut bb84 = engine(512);
        for seed in 0..25 {
            let outcome = run(&mut bb84, false, seed);
            assert!(outcome.valid && !outcome.compromised, "seed {seed}");
            assert_eq!(outcome.qber, Some(0.0));
            assert_eq!(bb84.report().unwrap().sifted_errors, 0);
        }
    }

    #[test]
    fn key_holds_alice_bits_at_unsacrificed_sifted_positions() {
        let mut bb84 = engine(400);
        run(&mut bb84, false, 2024);
        let report = bb84.report().unwrap().clone();
        assert_eq!(report.key_length, report.sifted_length - report.sacrificed);
        assert_eq!(bb84.key().unwrap().len(), report.key_length.div_ceil(8));
    }

    #[test]
    fn intercept_resend_is_detected() {
        let mut bb84 = engine(2048);
        let outcome = run(&mut bb84, true, 18353);
        assert!(outcome.compromised && !outcome.valid);
        assert!(bb84.key().is_none());
        assert_eq!(bb84.encrypt("hi"), Err(CipherError::InvalidKey));
        assert_eq!(bb84.eve_raw().0.len(), 2048);
    }

    #[test]
    fn threshold_equal_to_qber_is_compromised() {
        // With no eavesdropper the sampled error rate is exactly zero, so a
        // zero threshold sits right on the boundary.
        let mut bb84 = Bb84::new(Bb84Config {
            key_length: 128,
            qber: 0.0,
            ..Bb84Config::default()
        })
        .unwrap();
        let outcome = run(&mut bb84, false, 5);
        assert_eq!(outcome.qber, Some(0.0));
        assert!(outcome.compromised);
    }

    #[test]
    fn single_basis_mismatch_leaves_nothing_to_sift() {
        // A one-qubit session with Bob in the other basis sifts to nothing.
        let mut bb84 = engine(1);
        let mut seed = 0;
        loop {
            let outcome = run(&mut bb84, false, seed);
            let report = bb84.report().unwrap();
            if report.sifted_length == 0 {
                assert!(outcome.compromised && !outcome.valid);
                break;
            }
            seed += 1;
        }
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut bb84 = engine(512);
        let first = run(&mut bb84, false, 99);
        let key = bb84.key().map(<[u8]>::to_vec);
        let second = bb84.reconcile_key().unwrap();
        assert_eq!(first, second);
        assert_eq!(bb84.key().map(<[u8]>::to_vec), key);
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut bb84 = engine(16);
        assert!(matches!(
            bb84.send_key(false, None),
            Err(ProtocolError::OutOfOrder { .. })
        ));
        bb84.generate_key(Some(1));
        assert!(matches!(
            bb84.reconcile_key(),
            Err(ProtocolError::OutOfOrder { .. })
        ));
        bb84.send_key(false, None).unwrap();
        assert!(matches!(
            bb84.send_key(false, None),
            Err(ProtocolError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn regenerating_starts_a_fresh_session() {
        let mut bb84 = engine(256);
        run(&mut bb84, true, 7);
        bb84.generate_key(Some(7));
        assert_eq!(bb84.is_key_compromised(), None);
        assert!(bb84.report().is_none());
        assert!(bb84.eve_raw().0.is_empty());
    }
}
