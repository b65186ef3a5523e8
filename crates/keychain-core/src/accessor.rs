//! Address-book access to the secure store
//!
//! Every entry is keyed by `(namespace, address)` and carries a nickname and
//! a secret value. The accessor keeps no state of its own; all persistence
//! belongs to the injected [`SecureStorage`].

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::crypto::SecretString;
use crate::error::{KeychainError, Result};
use crate::record::{parse_nickname, KeychainEntry, KeychainRecord, DEFAULT_NICKNAME};
use crate::storage::SecureStorage;

/// Credential accessor over a secure store
#[derive(Clone)]
pub struct KeychainAccessor {
    storage: Arc<dyn SecureStorage>,
}

impl KeychainAccessor {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Nickname encoded in a keychain label, if any
    pub fn get_nickname(label: &str) -> Option<String> {
        parse_nickname(label)
    }

    /// Secret value stored for `address`, or `None` if there is no entry
    pub fn get_keychain_value(
        &self,
        namespace: &str,
        address: &Address,
    ) -> Result<Option<SecretString>> {
        Ok(self
            .load_record(namespace, address)?
            .map(KeychainRecord::into_secret))
    }

    /// Create or overwrite the entry for `address`
    pub fn add_keychain_value(
        &self,
        namespace: &str,
        address: &Address,
        nickname: &str,
        value: &str,
    ) -> Result<()> {
        validate_namespace(namespace)?;

        let record = KeychainRecord::new(address, nickname, value)?;
        self.storage
            .store(namespace, address.as_str(), &record.to_bytes()?)?;

        info!("Stored keychain value for {} in {}", address, namespace);
        Ok(())
    }

    /// Delete the entry for `address`; `false` if there was none
    pub fn remove_keychain_value(&self, namespace: &str, address: &Address) -> Result<bool> {
        validate_namespace(namespace)?;

        let removed = self.storage.delete(namespace, address.as_str())?;
        if removed {
            info!("Removed keychain value for {} from {}", address, namespace);
        } else {
            debug!("No keychain value to remove for {} in {}", address, namespace);
        }
        Ok(removed)
    }

    /// Nickname of every entry under `namespace`
    pub fn get_keychain_nicknames(&self, namespace: &str) -> Result<HashMap<Address, String>> {
        Ok(self
            .entries(namespace)?
            .into_iter()
            .filter_map(|entry| entry.nickname.map(|nickname| (entry.address, nickname)))
            .collect())
    }

    /// Delete every entry under `namespace`.
    ///
    /// Best effort: failures are logged and skipped. Returns how many entries
    /// were removed.
    pub fn reset_keychain(&self, namespace: &str) -> usize {
        if let Err(e) = validate_namespace(namespace) {
            warn!("Refusing to reset keychain: {}", e);
            return 0;
        }

        // Accounts only: an undecodable value must still be removable
        let accounts = match self.storage.list_accounts(namespace) {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("Could not enumerate {} for reset: {}", namespace, e);
                return 0;
            }
        };

        let mut removed = 0;
        for account in accounts {
            match self.storage.delete(namespace, &account) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to remove {} from {}: {}", account, namespace, e),
            }
        }

        info!("Reset keychain namespace {} ({} entries removed)", namespace, removed);
        removed
    }

    /// Nickname stored for `address`
    pub fn nickname(&self, namespace: &str, address: &Address) -> Result<Option<String>> {
        Ok(self
            .load_record(namespace, address)?
            .and_then(|record| record.nickname()))
    }

    /// Nickname stored for `address`, or [`DEFAULT_NICKNAME`]
    pub fn nickname_or_default(&self, namespace: &str, address: &Address) -> Result<String> {
        Ok(self
            .nickname(namespace, address)?
            .unwrap_or_else(|| DEFAULT_NICKNAME.to_string()))
    }

    /// Rename an existing entry, keeping its value; `false` if absent
    pub fn set_nickname(&self, namespace: &str, address: &Address, nickname: &str) -> Result<bool> {
        let Some(mut record) = self.load_record(namespace, address)? else {
            return Ok(false);
        };

        record.relabel(address, nickname)?;
        self.storage
            .store(namespace, address.as_str(), &record.to_bytes()?)?;

        info!("Renamed {} in {}", address, namespace);
        Ok(true)
    }

    pub fn contains(&self, namespace: &str, address: &Address) -> Result<bool> {
        validate_namespace(namespace)?;
        Ok(self.storage.retrieve(namespace, address.as_str())?.is_some())
    }

    /// All entries under `namespace`, sorted by address, without secrets.
    ///
    /// Entries whose account is not a valid address or whose record cannot
    /// be decoded are skipped.
    pub fn entries(&self, namespace: &str) -> Result<Vec<KeychainEntry>> {
        validate_namespace(namespace)?;

        let mut entries: Vec<KeychainEntry> = self
            .storage
            .list(namespace)?
            .into_iter()
            .filter_map(|(account, data)| {
                let address = match Address::parse(&account) {
                    Ok(address) => address,
                    Err(e) => {
                        warn!("Skipping keychain account {} in {}: {}", account, namespace, e);
                        return None;
                    }
                };
                match KeychainRecord::from_bytes(&address, &data) {
                    Ok(record) => Some(KeychainEntry {
                        nickname: record.nickname(),
                        updated_at: record.updated_at,
                        address,
                    }),
                    Err(e) => {
                        warn!("Skipping keychain entry in {}: {}", namespace, e);
                        None
                    }
                }
            })
            .collect();

        entries.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(entries)
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }

    pub fn is_hardware_backed(&self) -> bool {
        self.storage.is_hardware_backed()
    }

    fn load_record(&self, namespace: &str, address: &Address) -> Result<Option<KeychainRecord>> {
        validate_namespace(namespace)?;

        self.storage
            .retrieve(namespace, address.as_str())?
            .map(|data| KeychainRecord::from_bytes(address, &data))
            .transpose()
    }
}

fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(KeychainError::InvalidNamespace(
            "namespace must not be empty".to_string(),
        ));
    }
    if namespace.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(KeychainError::InvalidNamespace(format!(
            "'{}' contains whitespace or control characters",
            namespace.escape_debug()
        )));
    }
    Ok(())
}
