//! Storage trait definitions

use crate::error::Result;

/// A secure key-value store partitioned by namespace.
///
/// `account` is unique within a `namespace`; storing under an existing
/// account replaces the previous data.
pub trait SecureStorage: Send + Sync {
    /// Store `data` for `(namespace, account)`, replacing any existing value
    fn store(&self, namespace: &str, account: &str, data: &[u8]) -> Result<()>;

    /// Fetch the data for `(namespace, account)`
    fn retrieve(&self, namespace: &str, account: &str) -> Result<Option<Vec<u8>>>;

    /// Delete `(namespace, account)`; `false` if nothing was there
    fn delete(&self, namespace: &str, account: &str) -> Result<bool>;

    /// Every readable `(account, data)` pair under `namespace`, in no
    /// particular order. Values that cannot be decoded are skipped.
    fn list(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Every account under `namespace`, without reading its data
    fn list_accounts(&self, namespace: &str) -> Result<Vec<String>>;

    /// Whether the backend relies on OS-level key protection
    fn is_hardware_backed(&self) -> bool;

    /// Human-readable backend name
    fn backend_name(&self) -> &'static str;
}
