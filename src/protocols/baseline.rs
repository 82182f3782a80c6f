//! Baseline protocol: a uniformly random key with no physical simulation.
//!
//! The key is trusted as soon as it is generated, which makes this variant a
//! reference point for the QKD engines and a direct way to exercise the cipher.

use crate::cipher::{KeyMaterial, Reconciliation, pack_bits};
use crate::config::BaselineConfig;
use crate::core::errors::{ConfigError, ProtocolError};
use crate::protocols::{KeyDistribution, Protocol, Stage};
use crate::random::{self, Mt19937, RandomSource};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Baseline {
    config: BaselineConfig,
    rng: Mt19937,
    stage: Stage,
    material: KeyMaterial,
}

impl Baseline {
    pub fn new(config: BaselineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: random::entropy_seeded(),
            stage: Stage::Idle,
            material: KeyMaterial::default(),
        })
    }

    fn require_key(&self, operation: &'static str) -> Result<(), ProtocolError> {
        if self.stage == Stage::Idle {
            return Err(ProtocolError::OutOfOrder {
                operation,
                stage: self.stage.name(),
            });
        }
        Ok(())
    }
}

impl KeyDistribution for Baseline {
    fn protocol(&self) -> Protocol {
        Protocol::Baseline
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn generate_key(&mut self, seed: Option<u32>) {
        if let Some(seed) = seed {
            self.rng.reseed(seed);
        }

        let bits = self.rng.random_bits(self.config.key_length);
        self.material = KeyMaterial::trusted(pack_bits(&bits));
        self.stage = Stage::Generated;

        debug!(key_length = self.config.key_length, "baseline key generated");
    }

    /// Nothing travels over a channel; the key is already shared.
    fn send_key(&mut self, _eavesdropping: bool, seed: Option<u32>) -> Result<(), ProtocolError> {
        self.require_key("send key")?;
        if let Some(seed) = seed {
            self.rng.reseed(seed);
        }
        Ok(())
    }

    fn reconcile_key(&mut self) -> Result<Reconciliation, ProtocolError> {
        self.require_key("reconcile key")?;
        Ok(Reconciliation::accepted())
    }

    fn key_material(&self) -> &KeyMaterial {
        &self.material
    }
}
