//! Encrypted file storage backend
//!
//! All namespaces share one JSON file in the storage directory. Each value
//! is sealed individually with AES-256-GCM under a key derived from the
//! user's password; the file itself only reveals namespace and account names.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use super::SecureStorage;
use crate::crypto::{
    derive_key, generate_salt, open, open_string, seal, seal_string, KeyDerivationParams,
    MasterKey,
};
use crate::error::{KeychainError, Result};

const STORAGE_FILE: &str = "keychain.json";
const SALT_FILE: &str = "salt";
const VERIFY_FILE: &str = "verify";
const VERIFICATION_TOKEN: &str = "keychain-core-verification";
const FILE_VERSION: u32 = 1;

/// namespace -> account -> sealed value
type Namespaces = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    namespaces: Namespaces,
}

/// Encrypted file storage backend
pub struct EncryptedFileStorage {
    storage_dir: PathBuf,
    namespaces: RwLock<Namespaces>,
    master_key: RwLock<Option<MasterKey>>,
    params: KeyDerivationParams,
}

impl EncryptedFileStorage {
    /// Open storage in the platform data directory
    pub fn new() -> Result<Self> {
        Self::with_dir(default_storage_dir()?)
    }

    /// Open storage in a specific directory, creating it if needed
    pub fn with_dir(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;

        let storage = Self {
            storage_dir,
            namespaces: RwLock::new(Namespaces::new()),
            master_key: RwLock::new(None),
            params: KeyDerivationParams::default(),
        };
        storage.load()?;

        debug!("Encrypted file storage opened at {:?}", storage.storage_dir);
        Ok(storage)
    }

    /// Override the Argon2id cost parameters used by [`unlock`](Self::unlock)
    pub fn with_params(mut self, params: KeyDerivationParams) -> Self {
        self.params = params;
        self
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn storage_file_path(&self) -> PathBuf {
        self.storage_dir.join(STORAGE_FILE)
    }

    fn salt_file_path(&self) -> PathBuf {
        self.storage_dir.join(SALT_FILE)
    }

    fn verification_file_path(&self) -> PathBuf {
        self.storage_dir.join(VERIFY_FILE)
    }

    /// Whether a password has ever been set for this directory
    pub fn is_initialized(&self) -> bool {
        self.salt_file_path().exists() && self.verification_file_path().exists()
    }

    pub fn is_unlocked(&self) -> bool {
        self.master_key.read().map(|k| k.is_some()).unwrap_or(false)
    }

    /// Derive the storage key from `password`.
    ///
    /// The first unlock of a directory sets the password; later unlocks must
    /// match it or fail with `InvalidPassword`.
    pub fn unlock(&self, password: &str) -> Result<()> {
        let salt = match self.load_salt()? {
            Some(salt) => salt,
            None => {
                let salt = generate_salt();
                std::fs::write(self.salt_file_path(), &salt)?;
                salt
            }
        };

        let key = derive_key(password, &salt, self.params)?;
        let verify_path = self.verification_file_path();

        if verify_path.exists() {
            let sealed = std::fs::read_to_string(&verify_path)?;
            match open_string(&sealed, &key) {
                Ok(token) if token == VERIFICATION_TOKEN => {}
                _ => return Err(KeychainError::InvalidPassword),
            }
        } else {
            std::fs::write(&verify_path, seal_string(VERIFICATION_TOKEN, &key)?)?;
            info!("Initialized encrypted file storage at {:?}", self.storage_dir);
        }

        self.set_master_key(Some(key))?;
        debug!("Encrypted file storage unlocked");
        Ok(())
    }

    /// Forget the in-memory key
    pub fn lock(&self) -> Result<()> {
        self.set_master_key(None)
    }

    pub fn set_master_key(&self, key: Option<MasterKey>) -> Result<()> {
        *self.master_key.write().map_err(|_| KeychainError::poisoned())? = key;
        Ok(())
    }

    fn load_salt(&self) -> Result<Option<String>> {
        let path = self.salt_file_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?.trim().to_string()))
    }

    /// Reload entries from disk
    pub fn load(&self) -> Result<()> {
        let path = self.storage_file_path();

        let loaded = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: StorageFile = serde_json::from_str(&contents)?;
            if file.version != FILE_VERSION {
                return Err(KeychainError::StorageError(format!(
                    "unsupported storage file version {}",
                    file.version
                )));
            }
            file.namespaces
        } else {
            debug!("No existing storage file found");
            Namespaces::new()
        };

        let count: usize = loaded.values().map(BTreeMap::len).sum();
        *self.namespaces.write().map_err(|_| KeychainError::poisoned())? = loaded;

        debug!("Loaded {} entries from storage", count);
        Ok(())
    }

    fn save(&self, namespaces: &Namespaces) -> Result<()> {
        let file = StorageFile {
            version: FILE_VERSION,
            namespaces: namespaces.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        let path = self.storage_file_path();
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn with_key<T>(&self, f: impl FnOnce(&MasterKey) -> Result<T>) -> Result<T> {
        let guard = self.master_key.read().map_err(|_| KeychainError::poisoned())?;
        let key = guard.as_ref().ok_or(KeychainError::Locked)?;
        f(key)
    }
}

fn default_storage_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "keychain-core", "keychain-core")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            KeychainError::StorageError("Could not determine data directory".to_string())
        })
}

impl SecureStorage for EncryptedFileStorage {
    fn store(&self, namespace: &str, account: &str, data: &[u8]) -> Result<()> {
        let sealed = self.with_key(|key| seal(data, key))?;

        // Only publish the change once it is on disk
        let mut namespaces = self.namespaces.write().map_err(|_| KeychainError::poisoned())?;
        let mut updated = namespaces.clone();
        updated
            .entry(namespace.to_string())
            .or_default()
            .insert(account.to_string(), sealed);
        self.save(&updated)?;
        *namespaces = updated;

        debug!("Stored {}/{}", namespace, account);
        Ok(())
    }

    fn retrieve(&self, namespace: &str, account: &str) -> Result<Option<Vec<u8>>> {
        self.with_key(|key| {
            let namespaces = self.namespaces.read().map_err(|_| KeychainError::poisoned())?;
            namespaces
                .get(namespace)
                .and_then(|entries| entries.get(account))
                .map(|sealed| open(sealed, key))
                .transpose()
        })
    }

    fn delete(&self, namespace: &str, account: &str) -> Result<bool> {
        let mut namespaces = self.namespaces.write().map_err(|_| KeychainError::poisoned())?;

        let present = namespaces
            .get(namespace)
            .is_some_and(|entries| entries.contains_key(account));
        if !present {
            return Ok(false);
        }

        let mut updated = namespaces.clone();
        if let Some(entries) = updated.get_mut(namespace) {
            entries.remove(account);
            if entries.is_empty() {
                updated.remove(namespace);
            }
        }
        self.save(&updated)?;
        *namespaces = updated;

        debug!("Deleted {}/{}", namespace, account);
        Ok(true)
    }

    fn list(&self, namespace: &str) -> Result<Vec<(String, Vec<u8>)>> {
        self.with_key(|key| {
            let namespaces = self.namespaces.read().map_err(|_| KeychainError::poisoned())?;
            let Some(entries) = namespaces.get(namespace) else {
                return Ok(Vec::new());
            };

            Ok(entries
                .iter()
                .filter_map(|(account, sealed)| match open(sealed, key) {
                    Ok(data) => Some((account.clone(), data)),
                    Err(e) => {
                        warn!("Skipping unreadable entry {}/{}: {}", namespace, account, e);
                        None
                    }
                })
                .collect())
        })
    }

    fn list_accounts(&self, namespace: &str) -> Result<Vec<String>> {
        let namespaces = self.namespaces.read().map_err(|_| KeychainError::poisoned())?;
        Ok(namespaces
            .get(namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "Encrypted File Storage"
    }
}
