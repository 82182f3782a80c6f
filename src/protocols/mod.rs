//! Key distribution protocols.
//!
//! This module contains the baseline random-key scheme and the QKD engines
//! (BB84 and E91), all exposed through the [`KeyDistribution`] interface and
//! selected by name through [`Engine`].

pub mod baseline;
pub mod qkd;

pub use baseline::Baseline;
pub use qkd::{bb84::Bb84, e91::E91};

use crate::cipher::{KeyMaterial, Reconciliation, bit_string};
use crate::config::Config;
use crate::core::errors::{CipherError, ConfigError, ProtocolError};
use std::fmt;
use std::str::FromStr;

/// The fixed set of supported protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Random-key XOR stream cipher without any physical key distribution
    Baseline,
    Bb84,
    E91,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Baseline, Protocol::Bb84, Protocol::E91];

    /// Name used by the messaging layer.
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Baseline => "No Protocol",
            Protocol::Bb84 => "BB84 Protocol",
            Protocol::E91 => "Ekert Protocol",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ProtocolError::UnknownProtocol(s.to_string()))
    }
}

/// Progress of a single generate -> send -> reconcile session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Generated,
    Transmitted,
    Reconciled,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Generated => "generated",
            Stage::Transmitted => "transmitted",
            Stage::Reconciled => "reconciled",
        }
    }

    /// Fails unless the session is at `expected`.
    pub(crate) fn require(
        self,
        expected: Stage,
        operation: &'static str,
    ) -> Result<(), ProtocolError> {
        if self == expected {
            Ok(())
        } else {
            Err(ProtocolError::OutOfOrder {
                operation,
                stage: self.name(),
            })
        }
    }
}

/// Shared contract of every protocol variant.
///
/// A session is driven as `generate_key`, `send_key`, `reconcile_key`, after
/// which the resulting key encrypts and decrypts messages. Calling
/// `generate_key` again starts a fresh session.
pub trait KeyDistribution {
    fn protocol(&self) -> Protocol;

    fn stage(&self) -> Stage;

    /// Prepares raw key material. `Some(seed)` restarts the session's
    /// random stream, `None` continues it.
    fn generate_key(&mut self, seed: Option<u32>);

    /// Transmits the prepared material, optionally through an interceptor.
    fn send_key(&mut self, eavesdropping: bool, seed: Option<u32>) -> Result<(), ProtocolError>;

    /// Runs the security check once and caches its outcome.
    fn reconcile_key(&mut self) -> Result<Reconciliation, ProtocolError>;

    fn key_material(&self) -> &KeyMaterial;

    fn key(&self) -> Option<&[u8]> {
        self.key_material().key()
    }

    /// Key rendered as `0`/`1` characters.
    fn key_bits(&self) -> Option<String> {
        self.key().map(bit_string)
    }

    fn is_key_valid(&self) -> bool {
        self.key_material().is_valid()
    }

    /// `None` until a reconciliation has run.
    fn is_key_compromised(&self) -> Option<bool> {
        self.key_material().is_compromised()
    }

    fn encrypt(&self, message: &str) -> Result<Vec<u8>, CipherError> {
        self.key_material().encrypt_str(message)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<String, CipherError> {
        self.key_material().decrypt_to_string(ciphertext)
    }

    /// Fails unless `declared` names this engine's protocol.
    fn check_protocol(&self, declared: &str) -> Result<(), ProtocolError> {
        if declared == self.protocol().name() {
            Ok(())
        } else {
            Err(ProtocolError::UnsupportedProtocol {
                declared: declared.to_string(),
                expected: self.protocol().name().to_string(),
            })
        }
    }
}

/// Engine for one of the supported protocols.
#[derive(Debug, Clone)]
pub enum Engine {
    Baseline(Baseline),
    Bb84(Bb84),
    E91(E91),
}

impl Engine {
    /// Builds the engine for `protocol` from its section of `config`.
    pub fn new(protocol: Protocol, config: &Config) -> Result<Self, ConfigError> {
        Ok(match protocol {
            Protocol::Baseline => Engine::Baseline(Baseline::new(config.baseline.clone())?),
            Protocol::Bb84 => Engine::Bb84(Bb84::new(config.bb84.clone())?),
            Protocol::E91 => Engine::E91(E91::new(config.e91.clone())?),
        })
    }

    /// Builds the engine for a messaging-layer protocol name.
    pub fn from_name(name: &str, config: &Config) -> Result<Self, ProtocolError> {
        Ok(Self::new(name.parse()?, config)?)
    }

    fn inner(&self) -> &dyn KeyDistribution {
        match self {
            Engine::Baseline(e) => e,
            Engine::Bb84(e) => e,
            Engine::E91(e) => e,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn KeyDistribution {
        match self {
            Engine::Baseline(e) => e,
            Engine::Bb84(e) => e,
            Engine::E91(e) => e,
        }
    }
}

impl KeyDistribution for Engine {
    fn protocol(&self) -> Protocol {
        self.inner().protocol()
    }

    fn stage(&self) -> Stage {
        self.inner().stage()
    }

    fn generate_key(&mut self, seed: Option<u32>) {
        self.inner_mut().generate_key(seed)
    }

    fn send_key(&mut self, eavesdropping: bool, seed: Option<u32>) -> Result<(), ProtocolError> {
        self.inner_mut().send_key(eavesdropping, seed)
    }

    fn reconcile_key(&mut self) -> Result<Reconciliation, ProtocolError> {
        self.inner_mut().reconcile_key()
    }

    fn key_material(&self) -> &KeyMaterial {
        self.inner().key_material()
    }
}
