//! Key and secret wrappers that wipe their memory on drop

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// Symmetric key protecting the encrypted-file backend
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Copy a key out of a slice; `None` unless the slice is exactly 32 bytes
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; KEY_LEN] = slice.try_into().ok()?;
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// A secret value read back from the keychain
///
/// The buffer is zeroed when dropped and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: String) -> Self {
        Self { value }
    }

    /// Borrow the plaintext (keep the borrow short)
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Take the plaintext out, leaving an empty buffer behind to be zeroed
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.value)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_key_slice_length() {
        assert!(MasterKey::from_slice(&[7u8; KEY_LEN]).is_some());
        assert!(MasterKey::from_slice(&[7u8; 16]).is_none());
        assert!(MasterKey::from_slice(&[]).is_none());
    }

    #[test]
    fn test_secret_into_inner() {
        let secret = SecretString::from("secret123");
        assert_eq!(secret.expose(), "secret123");
        assert_eq!(secret.into_inner(), "secret123");
    }

    #[test]
    fn test_debug_never_prints_secret() {
        let secret = SecretString::from("hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));

        let key = MasterKey::new([0xAA; KEY_LEN]);
        assert_eq!(format!("{:?}", key), "MasterKey([REDACTED])");
    }
}
