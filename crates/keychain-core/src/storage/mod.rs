//! Storage backends for keychain entries
//!
//! 1. OS keychain (hardware-backed where available)
//! 2. Encrypted file (fallback when no keychain service is reachable)
//! 3. In-memory (tests and throwaway sessions)

mod encrypted_file;
mod keychain;
mod memory;
mod traits;

pub use encrypted_file::EncryptedFileStorage;
pub use keychain::KeychainStorage;
pub use memory::MemoryStorage;
pub use traits::SecureStorage;
