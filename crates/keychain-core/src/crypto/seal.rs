//! AES-256-GCM sealing for record values
//!
//! Sealed form is standard base64 of `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

use super::MasterKey;
use crate::error::{KeychainError, Result};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn cipher(key: &MasterKey) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| KeychainError::EncryptionError(e.to_string()))
}

/// Seal plaintext under `key` with a fresh random nonce
pub fn seal(plaintext: &[u8], key: &MasterKey) -> Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher(key)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| KeychainError::EncryptionError(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Open a value produced by [`seal`]
pub fn open(sealed: &str, key: &MasterKey) -> Result<Vec<u8>> {
    let raw = STANDARD
        .decode(sealed.trim())
        .map_err(|e| KeychainError::DecryptionError(format!("invalid base64: {}", e)))?;

    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(KeychainError::DecryptionError(format!(
            "sealed value too short: {} bytes",
            raw.len()
        )));
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    cipher(key)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| KeychainError::DecryptionError("authentication failed".to_string()))
}

pub fn seal_string(plaintext: &str, key: &MasterKey) -> Result<String> {
    seal(plaintext.as_bytes(), key)
}

pub fn open_string(sealed: &str, key: &MasterKey) -> Result<String> {
    String::from_utf8(open(sealed, key)?)
        .map_err(|e| KeychainError::DecryptionError(format!("invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> MasterKey {
        MasterKey::new([byte; 32])
    }

    #[test]
    fn test_open_recovers_plaintext() {
        let k = key(1);
        let sealed = seal_string("secret123", &k).unwrap();
        assert_eq!(open_string(&sealed, &k).unwrap(), "secret123");
    }

    #[test]
    fn test_nonce_is_fresh_per_seal() {
        let k = key(1);
        let a = seal(b"same", &k).unwrap();
        let b = seal(b"same", &k).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sealed = seal(b"secret", &key(1)).unwrap();
        let err = open(&sealed, &key(2)).unwrap_err();
        assert!(matches!(err, KeychainError::DecryptionError(_)));
    }

    #[test]
    fn test_tampering_detected() {
        let k = key(3);
        let sealed = seal(b"secret", &k).unwrap();

        let mut raw = STANDARD.decode(&sealed).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        assert!(open(&STANDARD.encode(raw), &k).is_err());
    }

    #[test]
    fn test_malformed_input() {
        let k = key(4);
        assert!(open("not base64!!", &k).is_err());
        assert!(open(&STANDARD.encode([0u8; 8]), &k).is_err());
    }
}
