// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Symmetric encryption of custodial key material at rest.
//!
//! Private keys are sealed with ChaCha20-Poly1305 under a single 256-bit key
//! loaded from `ENCRYPTION_KEY` at startup. The stored form is
//!
//! ```text
//! hex(nonce) ":" hex(ciphertext || tag)
//! ```
//!
//! Both halves are lowercase hex, so the delimiter can never be produced by
//! the encoding itself. A fresh 96-bit nonce is drawn from the OS RNG on every
//! call to [`KeyCipher::encrypt`].

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::{rngs::OsRng, RngCore};

/// Required key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305.
pub const NONCE_LEN: usize = 12;

const DELIMITER: char = ':';

/// Errors raised by [`KeyCipher`].
///
/// Messages never echo the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("invalid encryption configuration: {0}")]
    InvalidConfiguration(String),

    #[error("ciphertext is not in nonce:payload form")]
    MalformedCiphertext,

    #[error("ciphertext could not be decrypted")]
    DecryptionFailed,

    #[error("plaintext could not be encrypted")]
    EncryptionFailed,
}

/// Process-wide cipher for private-key material.
///
/// Constructed once at startup and shared behind an `Arc`. The key is never
/// rotated for the lifetime of the process.
pub struct KeyCipher {
    cipher: ChaCha20Poly1305,
}

impl KeyCipher {
    /// Build a cipher from raw key bytes. Fails unless exactly 32 bytes.
    pub fn new(secret: &[u8]) -> Result<Self, CipherError> {
        if secret.len() != KEY_LEN {
            return Err(CipherError::InvalidConfiguration(format!(
                "encryption key must be exactly {KEY_LEN} bytes, got {}",
                secret.len()
            )));
        }

        let key = Key::from_slice(secret);
        Ok(Self {
            cipher: ChaCha20Poly1305::new(key),
        })
    }

    /// Build a cipher from the configured secret string (UTF-8 bytes are the key).
    pub fn from_secret(secret: Option<&str>) -> Result<Self, CipherError> {
        match secret {
            Some(value) if !value.is_empty() => Self::new(value.as_bytes()),
            _ => Err(CipherError::InvalidConfiguration(
                "encryption key is not set".to_string(),
            )),
        }
    }

    /// Encrypt `plaintext` under a freshly generated nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        self.encrypt_with_nonce(plaintext, &nonce)
    }

    /// Deterministic variant used for fixed test vectors.
    pub(crate) fn encrypt_with_nonce(
        &self,
        plaintext: &str,
        nonce: &[u8; NONCE_LEN],
    ) -> Result<String, CipherError> {
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        Ok(format!(
            "{}{DELIMITER}{}",
            alloy::hex::encode(nonce),
            alloy::hex::encode(sealed)
        ))
    }

    /// Decrypt a value produced by [`KeyCipher::encrypt`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let parts: Vec<&str> = ciphertext.split(DELIMITER).collect();
        let [nonce_hex, payload_hex] = parts.as_slice() else {
            return Err(CipherError::MalformedCiphertext);
        };

        let nonce = decode_lower_hex(nonce_hex)?;
        if nonce.len() != NONCE_LEN {
            return Err(CipherError::DecryptionFailed);
        }
        let payload = decode_lower_hex(payload_hex)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), payload.as_slice())
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
    }
}

impl std::fmt::Debug for KeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyCipher { .. }")
    }
}

/// Strict lowercase-hex decoding. Any other spelling of the same bytes is
/// treated as tampering.
fn decode_lower_hex(value: &str) -> Result<Vec<u8>, CipherError> {
    if !value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(CipherError::DecryptionFailed);
    }
    alloy::hex::decode(value).map_err(|_| CipherError::DecryptionFailed)
}
