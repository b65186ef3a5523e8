//! # keychain-core
//!
//! Address book on top of a platform credential store. Each entry pairs an
//! address with a nickname and a secret value inside a namespace:
//! - `KeychainAccessor` for lookups, upserts, removal, enumeration and reset
//! - OS keychain backend with an encrypted-file fallback
//! - In-memory backend for tests
//! - Zeroize-on-drop handling of secret values

pub mod address;
pub mod crypto;
pub mod error;
pub mod record;
pub mod settings;
pub mod storage;
mod accessor;

pub use accessor::KeychainAccessor;
pub use address::Address;
pub use crypto::SecretString;
pub use error::{KeychainError, Result};
pub use record::{KeychainEntry, DEFAULT_NICKNAME};
pub use settings::{open_storage, KeychainSettings, StorageBackend};
pub use storage::{EncryptedFileStorage, KeychainStorage, MemoryStorage, SecureStorage};
