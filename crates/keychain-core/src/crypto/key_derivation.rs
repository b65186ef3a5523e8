//! Argon2id key derivation for the encrypted-file backend

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use super::secure_memory::KEY_LEN;
use super::MasterKey;
use crate::error::{KeychainError, Result};

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Number of passes
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 64 * 1024,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    /// Cheap parameters for tests and low-value local stores
    pub fn interactive() -> Self {
        Self {
            memory_cost: 8 * 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Fresh random salt in PHC base64 form
pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).to_string()
}

/// Derive the 32-byte storage key from a password and salt
pub fn derive_key(password: &str, salt: &str, params: KeyDerivationParams) -> Result<MasterKey> {
    let argon_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KeychainError::KeyDerivationError(e.to_string()))?;

    let salt = SaltString::from_b64(salt)
        .map_err(|e| KeychainError::KeyDerivationError(format!("invalid salt: {}", e)))?;

    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| KeychainError::KeyDerivationError(e.to_string()))?
        .hash
        .ok_or_else(|| KeychainError::KeyDerivationError("no hash output".to_string()))?;

    MasterKey::from_slice(hash.as_bytes()).ok_or_else(|| {
        KeychainError::KeyDerivationError(format!(
            "expected {} bytes of output, got {}",
            KEY_LEN,
            hash.as_bytes().len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KeyDerivationParams = KeyDerivationParams {
        memory_cost: 8 * 1024,
        time_cost: 1,
        parallelism: 1,
    };

    #[test]
    fn test_salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn test_same_inputs_same_key() {
        let salt = generate_salt();
        let a = derive_key("correct horse", &salt, FAST).unwrap();
        let b = derive_key("correct horse", &salt, FAST).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_password_and_salt_both_matter() {
        let salt = generate_salt();
        let base = derive_key("pw-one", &salt, FAST).unwrap();

        let other_pw = derive_key("pw-two", &salt, FAST).unwrap();
        assert_ne!(base.as_bytes(), other_pw.as_bytes());

        let other_salt = derive_key("pw-one", &generate_salt(), FAST).unwrap();
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
    }

    #[test]
    fn test_invalid_salt() {
        let err = derive_key("pw", "!!", FAST).unwrap_err();
        assert!(matches!(err, KeychainError::KeyDerivationError(_)));
    }

    #[test]
    fn test_interactive_params_match_fast() {
        assert_eq!(KeyDerivationParams::interactive(), FAST);
    }
}
