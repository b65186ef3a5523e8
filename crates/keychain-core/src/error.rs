//! Error types for keychain-core

use thiserror::Error;

/// Result type alias for keychain operations
pub type Result<T> = std::result::Result<T, KeychainError>;

/// Keychain error types
#[derive(Error, Debug)]
pub enum KeychainError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Secure store operation failed: {0}")]
    StoreFailure(String),

    #[error("Keychain is not available on this system")]
    KeychainUnavailable,

    #[error("Storage is locked - unlock with password first")]
    Locked,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Invalid nickname: {0}")]
    InvalidNickname(String),

    #[error("Corrupt record for {0}")]
    CorruptRecord(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Decryption failed: {0}")]
    DecryptionError(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl KeychainError {
    /// Whether this error only reports a missing entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn poisoned() -> Self {
        Self::StorageError("storage lock poisoned".to_string())
    }
}

impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => Self::NotFound("keychain entry".to_string()),
            keyring::Error::NoStorageAccess(e) | keyring::Error::PlatformFailure(e) => {
                Self::StoreFailure(e.to_string())
            }
            other => Self::StoreFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(KeychainError::NotFound("0xabc".to_string()).is_not_found());
        assert!(!KeychainError::StoreFailure("denied".to_string()).is_not_found());
        assert!(!KeychainError::Locked.is_not_found());
    }

    #[test]
    fn test_keyring_no_entry_maps_to_not_found() {
        let err: KeychainError = keyring::Error::NoEntry.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_display_messages() {
        let err = KeychainError::InvalidNamespace("".to_string());
        assert_eq!(err.to_string(), "Invalid namespace: ");

        let err = KeychainError::StoreFailure("quota exceeded".to_string());
        assert!(err.to_string().contains("quota exceeded"));
    }
}
