//! OS keychain storage backend
//!
//! Uses the system keychain through `keyring`:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Each namespace maps to its own keychain service (`<service>.<namespace>`)
//! and each account to a user within it. `keyring` has no enumeration API,
//! so every namespace also carries an index item listing its accounts.

use std::collections::BTreeSet;

use base64::{engine::general_purpose::STANDARD, Engine};
use keyring::Entry;
use tracing::{debug, warn};

use super::SecureStorage;
use crate::error::{KeychainError, Result};

/// Account holding the JSON list of accounts in a namespace
const INDEX_ACCOUNT: &str = "__accounts__";

/// Account used to check that the keychain accepts writes
const PROBE_ACCOUNT: &str = "__probe__";

/// OS keychain storage backend
pub struct KeychainStorage {
    service_name: String,
    available: bool,
}

impl KeychainStorage {
    /// Create a keychain backend whose items live under `service_name`
    pub fn new(service_name: &str) -> Self {
        let available = Self::probe(service_name);

        if available {
            debug!("Keychain storage is available for service {}", service_name);
        } else {
            warn!("Keychain storage is not available for service {}", service_name);
        }

        Self {
            service_name: service_name.to_string(),
            available,
        }
    }

    fn probe(service_name: &str) -> bool {
        let Ok(entry) = Entry::new(service_name, PROBE_ACCOUNT) else {
            return false;
        };
        if entry.set_password("probe").is_err() {
            return false;
        }
        let _ = entry.delete_password();
        true
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(KeychainError::KeychainUnavailable)
        }
    }

    fn service(&self, namespace: &str) -> String {
        format!("{}.{}", self.service_name, namespace)
    }

    fn entry(&self, namespace: &str, account: &str) -> Result<Entry> {
        Ok(Entry::new(&self.service(namespace), account)?)
    }

    fn read_password(&self, namespace: &str, account: &str) -> Result<Option<String>> {
        match self.entry(namespace, account)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_index(&self, namespace: &str) -> Result<BTreeSet<String>> {
        match self.read_password(namespace, INDEX_ACCOUNT)? {
            Some(raw) => decode_index(&raw),
            None => Ok(BTreeSet::new()),
        }
    }

    fn write_index(&self, namespace: &str, accounts: &BTreeSet<String>) -> Result<()> {
        let entry = self.entry(namespace, INDEX_ACCOUNT)?;

        if accounts.is_empty() {
            return match entry.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        entry.set_password(&encode_index(accounts)?)?;
        Ok(())
    }
}

/// Add `account` to the index before running `write`, so a stored item is
/// never missing from the index. If `write` fails the account is taken out
/// of the index again.
fn indexed_write(
    index: &mut BTreeSet<String>,
    account: &str,
    persist_index: impl Fn(&BTreeSet<String>) -> Result<()>,
    write: impl FnOnce() -> Result<()>,
) -> Result<()> {
    let added = index.insert(account.to_string());
    if added {
        persist_index(index)?;
    }

    if let Err(e) = write() {
        if added {
            index.remove(account);
            if let Err(rollback) = persist_index(index) {
                warn!("Keychain index still lists {} after failed write: {}", account, rollback);
            }
        }
        return Err(e);
    }
    Ok(())
}

fn encode_index(accounts: &BTreeSet<String>) -> Result<String> {
    Ok(serde_json::to_string(accounts)?)
}

fn decode_index(raw: &str) -> Result<BTreeSet<String>> {
    serde_json::from_str(raw)
        .map_err(|e| KeychainError::StorageError(format!("corrupt keychain index: {}", e)))
}

fn decode_value(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| KeychainError::StorageError(format!("Base64 decode error: {}", e)))
}

impl SecureStorage for KeychainStorage {
    fn store(&self, namespace: &str, account: &str, data: &[u8]) -> Result<()> {
        self.ensure_available()?;

        let encoded = STANDARD.encode(data);
        let mut index = self.read_index(namespace)?;
        indexed_write(
            &mut index,
            account,
            |accounts| self.write_index(namespace, accounts),
            || {
                self.entry(namespace, account)?.set_password(&encoded)?;
                Ok(())
            },
        )?;

        debug!("Stored keychain item {}/{}", namespace, account);
        Ok(())
    }

    fn retrieve(&self, namespace: &str, account: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_available()?;

        match self.read_password(namespace, account)? {
            Some(encoded) => decode_value(&encoded).map(Some),
            None => {
                debug!("Keychain item not found: {}/{}", namespace, account);
                Ok(None)
            }
        }
    }

    fn delete(&self, namespace: &str, account: &str) -> Result<bool> {
        self.ensure_available()?;

        let removed = match self.entry(namespace, account)?.delete_password() {
            Ok(()) => true,
            Err(keyring::Error::NoEntry) => false,
            Err(e) => return Err(e.into()),
        };

        let mut index = self.read_index(namespace)?;
        if index.remove(account) {
            self.write_index(namespace, &index)?;
        }

        if removed {
            debug!("Deleted keychain item {}/{}", namespace, account);
        }
        Ok(removed)
    }

    fn list(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>> {
        self.ensure_available()?;

        let mut entries = Vec::new();
        for account in self.read_index(namespace)? {
            match self.read_password(namespace, &account)? {
                Some(encoded) => match decode_value(&encoded) {
                    Ok(data) => entries.push((account, data)),
                    Err(e) => warn!("Skipping keychain item {}/{}: {}", namespace, account, e),
                },
                // Removed outside this process; the index heals on the next write
                None => debug!("Indexed keychain item vanished: {}/{}", namespace, account),
            }
        }
        Ok(entries)
    }

    fn list_accounts(&self, namespace: &str) -> Result<Vec<String>> {
        self.ensure_available()?;
        Ok(self.read_index(namespace)?.into_iter().collect())
    }

    fn is_hardware_backed(&self) -> bool {
        self.available
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keychain";
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_availability_probe_does_not_panic() {
        let storage = KeychainStorage::new("keychain-core-test");
        let _ = storage.is_available();
    }

    #[test]
    fn test_service_per_namespace() {
        let storage = KeychainStorage {
            service_name: "keychain-core".to_string(),
            available: false,
        };
        assert_eq!(storage.service("wallets"), "keychain-core.wallets");
    }

    #[test]
    fn test_unavailable_keychain_refuses_operations() {
        let storage = KeychainStorage {
            service_name: "keychain-core".to_string(),
            available: false,
        };

        assert!(matches!(
            storage.store("wallets", "0xabc", b"x"),
            Err(KeychainError::KeychainUnavailable)
        ));
        assert!(matches!(
            storage.list("wallets"),
            Err(KeychainError::KeychainUnavailable)
        ));
        assert!(matches!(
            storage.list_accounts("wallets"),
            Err(KeychainError::KeychainUnavailable)
        ));
        assert!(!storage.is_hardware_backed());
    }

    #[test]
    fn test_index_encoding() {
        let accounts: BTreeSet<String> = ["0xdef", "0xabc"].iter().map(|s| s.to_string()).collect();
        let raw = encode_index(&accounts).unwrap();
        assert_eq!(raw, r#"["0xabc","0xdef"]"#);
        assert_eq!(decode_index(&raw).unwrap(), accounts);
    }

    fn accounts(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_indexed_write_records_new_account() {
        let persisted = RefCell::new(Vec::new());
        let mut index = accounts(&["0xabc"]);

        indexed_write(
            &mut index,
            "0xdef",
            |idx| {
                persisted.borrow_mut().push(idx.clone());
                Ok(())
            },
            || Ok(()),
        )
        .unwrap();

        assert_eq!(index, accounts(&["0xabc", "0xdef"]));
        assert_eq!(*persisted.borrow(), vec![accounts(&["0xabc", "0xdef"])]);
    }

    #[test]
    fn test_indexed_write_rolls_back_index_when_value_write_fails() {
        let persisted = RefCell::new(Vec::new());
        let mut index = accounts(&["0xabc"]);

        let result = indexed_write(
            &mut index,
            "0xdef",
            |idx| {
                persisted.borrow_mut().push(idx.clone());
                Ok(())
            },
            || Err(KeychainError::StoreFailure("denied".to_string())),
        );

        assert!(matches!(result, Err(KeychainError::StoreFailure(_))));
        assert_eq!(index, accounts(&["0xabc"]));
        assert_eq!(persisted.borrow().last(), Some(&accounts(&["0xabc"])));
    }

    #[test]
    fn test_indexed_write_skips_value_when_index_write_fails() {
        let mut index = BTreeSet::new();
        let wrote_value = Cell::new(false);

        let result = indexed_write(
            &mut index,
            "0xabc",
            |_| Err(KeychainError::StoreFailure("no storage access".to_string())),
            || {
                wrote_value.set(true);
                Ok(())
            },
        );

        assert!(result.is_err());
        assert!(!wrote_value.get());
    }

    #[test]
    fn test_indexed_write_existing_account_leaves_index_alone() {
        let persisted = Cell::new(0);
        let mut index = accounts(&["0xabc"]);

        let result = indexed_write(
            &mut index,
            "0xabc",
            |_| {
                persisted.set(persisted.get() + 1);
                Ok(())
            },
            || Err(KeychainError::StoreFailure("denied".to_string())),
        );

        assert!(result.is_err());
        assert_eq!(index, accounts(&["0xabc"]));
        assert_eq!(persisted.get(), 0);
    }

    #[test]
    fn test_corrupt_index() {
        let err = decode_index("{not a list").unwrap_err();
        assert!(matches!(err, KeychainError::StorageError(_)));
    }
}
