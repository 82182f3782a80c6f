//! One simulated conversation between Alice, Bob and (optionally) Eve.
//!
//! A [`Session`] owns its engine, so independent conversations never share
//! key material or random state. Every message operation first checks that
//! the caller declares the protocol the key was generated under.

use crate::cipher::Reconciliation;
use crate::config::Config;
use crate::core::errors::ProtocolError;
use crate::protocols::{Engine, KeyDistribution, Protocol};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, warn};

/// Ciphertext relayed from Alice to Bob and Eve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    /// Protocol name declared by the sender
    pub protocol: String,
    pub ciphertext: Vec<u8>,
}

impl Transmission {
    /// Base64 form of the ciphertext, as relayed for display.
    pub fn display(&self) -> String {
        STANDARD.encode(&self.ciphertext)
    }
}

/// What Eve obtains from an intercepted transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EveView {
    /// Eve did not tap the key exchange of this round
    Disabled,
    Decrypted(String),
}

#[derive(Debug, Clone)]
pub struct Session {
    engine: Engine,
    eavesdropping: bool,
    reconciliation: Reconciliation,
}

impl Session {
    /// Runs generate, send and reconcile for `protocol`.
    ///
    /// A compromised reconciliation still yields a session; its key simply
    /// refuses to encrypt.
    pub fn open(
        protocol: Protocol,
        eavesdropping: bool,
        config: &Config,
        seed: Option<u32>,
    ) -> Result<Self, ProtocolError> {
        let mut engine = Engine::new(protocol, config)?;
        engine.generate_key(seed);

        if eavesdropping {
            info!(%protocol, "Eve is eavesdropping the key");
        } else {
            info!(%protocol, "Eve isn't eavesdropping the key");
        }
        engine.send_key(eavesdropping, None)?;

        let reconciliation = engine.reconcile_key()?;
        if reconciliation.compromised {
            warn!(%protocol, "key exchange compromised");
        } else {
            info!(%protocol, valid = reconciliation.valid, "key reconciled");
        }

        Ok(Self {
            engine,
            eavesdropping,
            reconciliation,
        })
    }

    /// Opens a session for a messaging-layer protocol name.
    pub fn open_named(
        name: &str,
        eavesdropping: bool,
        config: &Config,
        seed: Option<u32>,
    ) -> Result<Self, ProtocolError> {
        Self::open(name.parse()?, eavesdropping, config, seed)
    }

    pub fn protocol(&self) -> Protocol {
        self.engine.protocol()
    }

    pub fn eavesdropping(&self) -> bool {
        self.eavesdropping
    }

    pub fn reconciliation(&self) -> Reconciliation {
        self.reconciliation
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Alice encrypts `message` under the declared protocol.
    pub fn alice_send(&self, message: &str, declared: &str) -> Result<Transmission, ProtocolError> {
        self.engine.check_protocol(declared)?;
        let ciphertext = self.engine.encrypt(message)?;
        let transmission = Transmission {
            protocol: declared.to_string(),
            ciphertext,
        };
        info!(ciphertext = %transmission.display(), "Alice sent");
        Ok(transmission)
    }

    pub fn bob_receive(&self, transmission: &Transmission) -> Result<String, ProtocolError> {
        self.engine.check_protocol(&transmission.protocol)?;
        let message = self.engine.decrypt(&transmission.ciphertext)?;
        info!(%message, "Bob decrypted message");
        Ok(message)
    }

    /// Eve can only read traffic from rounds in which she tapped the key.
    pub fn eve_receive(&self, transmission: &Transmission) -> Result<EveView, ProtocolError> {
        self.engine.check_protocol(&transmission.protocol)?;
        if !self.eavesdropping {
            info!("Eve can't decrypt message: eavesdropping disabled");
            return Ok(EveView::Disabled);
        }
        let message = self.engine.decrypt(&transmission.ciphertext)?;
        info!(%message, "Eve decrypted message");
        Ok(EveView::Decrypted(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::CipherError;

    #[test]
    fn baseline_round_reaches_bob() {
        let session = Session::open(Protocol::Baseline, false, &Config::default(), Some(77925)).unwrap();
        let sent = session.alice_send("hello bob", "No Protocol").unwrap();
        assert_ne!(sent.ciphertext, b"hello bob".to_vec());
        assert_eq!(session.bob_receive(&sent).unwrap(), "hello bob");
        assert_eq!(session.eve_receive(&sent).unwrap(), EveView::Disabled);
    }

    #[test]
    fn baseline_eavesdropper_reads_along() {
        let session = Session::open_named("No Protocol", true, &Config::default(), Some(1)).unwrap();
        let sent = session.alice_send("psst", "No Protocol").unwrap();
        assert_eq!(
            session.eve_receive(&sent).unwrap(),
            EveView::Decrypted("psst".to_string())
        );
    }

    #[test]
    fn declared_protocol_must_match() {
        let session = Session::open(Protocol::Baseline, false, &Config::default(), Some(2)).unwrap();
        assert!(matches!(
            session.alice_send("x", "BB84 Protocol"),
            Err(ProtocolError::UnsupportedProtocol { .. })
        ));

        let mut sent = session.alice_send("x", "No Protocol").unwrap();
        sent.protocol = "Ekert Protocol".to_string();
        assert!(matches!(
            session.bob_receive(&sent),
            Err(ProtocolError::UnsupportedProtocol { .. })
        ));
    }

    #[test]
    fn compromised_round_refuses_to_encrypt() {
        let session = Session::open(Protocol::Bb84, true, &Config::default(), Some(18353)).unwrap();
        assert!(session.reconciliation().compromised);
        assert!(matches!(
            session.alice_send("secret", "BB84 Protocol"),
            Err(ProtocolError::Cipher(CipherError::InvalidKey))
        ));
    }

    #[test]
    fn transmission_display_is_base64() {
        let t = Transmission {
            protocol: "No Protocol".to_string(),
            ciphertext: vec![0xde, 0xad, 0xbe, 0xef],
        };
        assert_eq!(t.display(), "3q2+7w==");
    }
}
