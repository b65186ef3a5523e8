//! In-memory storage backend

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::SecureStorage;
use crate::error::{KeychainError, Result};

/// Volatile storage; contents are lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStorage {
    namespaces: Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries under a namespace
    pub fn len(&self, namespace: &str) -> Result<usize> {
        let namespaces = self.namespaces.lock().map_err(|_| KeychainError::poisoned())?;
        Ok(namespaces.get(namespace).map_or(0, BTreeMap::len))
    }
}

impl SecureStorage for MemoryStorage {
    fn store(&self, namespace: &str, account: &str, data: &[u8]) -> Result<()> {
        let mut namespaces = self.namespaces.lock().map_err(|_| KeychainError::poisoned())?;
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(account.to_string(), data.to_vec());
        Ok(())
    }

    fn retrieve(&self, namespace: &str, account: &str) -> Result<Option<Vec<u8>>> {
        let namespaces = self.namespaces.lock().map_err(|_| KeychainError::poisoned())?;
        Ok(namespaces
            .get(namespace)
            .and_then(|entries| entries.get(account))
            .cloned())
    }

    fn delete(&self, namespace: &str, account: &str) -> Result<bool> {
        let mut namespaces = self.namespaces.lock().map_err(|_| KeychainError::poisoned())?;
        let Some(entries) = namespaces.get_mut(namespace) else {
            return Ok(false);
        };

        let removed = entries.remove(account).is_some();
        if entries.is_empty() {
            namespaces.remove(namespace);
        }
        Ok(removed)
    }

    fn list(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let namespaces = self.namespaces.lock().map_err(|_| KeychainError::poisoned())?;
        Ok(namespaces
            .get(namespace)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(account, data)| (account.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_accounts(&self, namespace: &str) -> Result<Vec<String>> {
        let namespaces = self.namespaces.lock().map_err(|_| KeychainError::poisoned())?;
        Ok(namespaces
            .get(namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "In-Memory Storage"
    }
}
