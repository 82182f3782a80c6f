//! Key material and the XOR stream cipher keyed by reconciled bits.
//!
//! Bits are packed most-significant first and the final byte is zero padded,
//! so a key of `n` bits occupies `ceil(n / 8)` bytes and exposes `8 * bytes`
//! usable key bits.

use crate::core::errors::CipherError;

/// Packs bits (each `0` or `1`) into bytes, most significant bit first.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | ((bit & 1) << (7 - i)))
        })
        .collect()
}

/// Expands bytes into bits, most significant bit first.
pub fn unpack_bits(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
        .collect()
}

/// Renders bytes as a string of `0`/`1` characters.
pub fn bit_string(bytes: &[u8]) -> String {
    unpack_bits(bytes)
        .into_iter()
        .map(|bit| if bit == 1 { '1' } else { '0' })
        .collect()
}

/// XORs `data` against the leading `data.len() * 8` bits of `key`.
pub fn xor_stream(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let message_bits = data.len() * 8;
    let key_bits = key.len() * 8;
    if message_bits > key_bits {
        return Err(CipherError::KeyTooShort {
            message_bits,
            key_bits,
        });
    }

    Ok(data.iter().zip(key).map(|(d, k)| d ^ k).collect())
}

/// Outcome of a reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub valid: bool,
    pub compromised: bool,
    /// Error rate on the sacrificed subset (BB84 only)
    pub qber: Option<f64>,
    /// CHSH value over all positions (E91 only)
    pub chsh: Option<f64>,
}

impl Reconciliation {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            compromised: false,
            qber: None,
            chsh: None,
        }
    }

    pub fn compromised() -> Self {
        Self {
            valid: false,
            compromised: true,
            qber: None,
            chsh: None,
        }
    }

    pub fn with_qber(mut self, qber: f64) -> Self {
        self.qber = Some(qber);
        self
    }

    pub fn with_chsh(mut self, chsh: f64) -> Self {
        self.chsh = Some(chsh);
        self
    }
}

/// Key held by an engine together with its validity flags.
///
/// `key` is present iff `valid`; `compromised` stays `None` until a
/// reconciliation has run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    key: Option<Vec<u8>>,
    valid: bool,
    compromised: Option<bool>,
}

impl KeyMaterial {
    /// Key accepted without a security check.
    pub fn trusted(bytes: Vec<u8>) -> Self {
        Self {
            key: Some(bytes),
            valid: true,
            compromised: None,
        }
    }

    /// Records a reconciliation outcome, attaching `bytes` only when valid.
    pub fn reconciled(outcome: &Reconciliation, bytes: Vec<u8>) -> Self {
        Self {
            key: outcome.valid.then_some(bytes),
            valid: outcome.valid,
            compromised: Some(outcome.compromised),
        }
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_compromised(&self) -> Option<bool> {
        self.compromised
    }

    /// Number of usable key bits.
    pub fn bit_len(&self) -> usize {
        self.key.as_ref().map_or(0, |k| k.len() * 8)
    }

    fn usable_key(&self) -> Result<&[u8], CipherError> {
        match (&self.key, self.valid) {
            (Some(key), true) => Ok(key),
            _ => Err(CipherError::InvalidKey),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        xor_stream(plaintext, self.usable_key()?)
    }

    /// XOR is self-inverse, so decryption reuses the same key prefix.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        xor_stream(ciphertext, self.usable_key()?)
    }

    pub fn encrypt_str(&self, message: &str) -> Result<Vec<u8>, CipherError> {
        self.encrypt(message.as_bytes())
    }

    pub fn decrypt_to_string(&self, ciphertext: &[u8]) -> Result<String, CipherError> {
        let plain = self.decrypt(ciphertext)?;
        String::from_utf8(plain).map_err(|_| CipherError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_is_msb_first_and_zero_padded() {
        assert_eq!(pack_bits(&[1, 0, 1, 1, 0, 0, 0, 0, 1]), vec![0b1011_0000, 0b1000_0000]);
        assert_eq!(unpack_bits(&[0b1000_0001]), vec![1, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn unpack_inverts_pack_on_whole_bytes() {
        let bits = vec![0, 1, 1, 0, 1, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0];
        assert_eq!(unpack_bits(&pack_bits(&bits)), bits);
    }

    #[test]
    fn default_material_rejects_encryption() {
        let material = KeyMaterial::default();
        assert!(!material.is_valid());
        assert_eq!(material.is_compromised(), None);
        assert_eq!(material.encrypt(b"hi"), Err(CipherError::InvalidKey));
        assert_eq!(material.decrypt(b"hi"), Err(CipherError::InvalidKey));
    }

    #[test]
    fn compromised_outcome_drops_key() {
        let material = KeyMaterial::reconciled(&Reconciliation::compromised(), vec![0xff]);
        assert_eq!(material.key(), None);
        assert_eq!(material.is_compromised(), Some(true));
        assert_eq!(material.encrypt(b"x"), Err(CipherError::InvalidKey));
    }

    #[test]
    fn key_too_short_reports_bit_counts() {
        let material = KeyMaterial::trusted(vec![0xaa, 0x55]);
        assert_eq!(
            material.encrypt(b"abc"),
            Err(CipherError::KeyTooShort {
                message_bits: 24,
                key_bits: 16
            })
        );
    }

    #[test]
    fn encrypt_uses_leading_key_prefix() {
        let material = KeyMaterial::trusted(vec![0x0f, 0xf0, 0xff]);
        assert_eq!(material.encrypt(&[0xff]).unwrap(), vec![0xf0]);
        assert_eq!(material.decrypt_to_string(&material.encrypt_str("ok").unwrap()).unwrap(), "ok");
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let material = KeyMaterial::trusted(vec![0x00]);
        assert_eq!(material.decrypt_to_string(&[0xff]), Err(CipherError::InvalidUtf8));
    }
}
