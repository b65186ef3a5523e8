//! Cryptographic primitives for the encrypted-file backend
//!
//! - Argon2id password-based key derivation
//! - AES-256-GCM sealing of individual record values
//! - Zeroize-on-drop wrappers for keys and secrets

mod key_derivation;
mod seal;
mod secure_memory;

pub use key_derivation::{derive_key, generate_salt, KeyDerivationParams};
pub use seal::{open, open_string, seal, seal_string};
pub use secure_memory::{MasterKey, SecretString};
