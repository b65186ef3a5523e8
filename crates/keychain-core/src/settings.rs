//! Backend configuration
//!
//! Stored as a plain JSON file; nothing in it is sensitive.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::crypto::KeyDerivationParams;
use crate::error::{KeychainError, Result};
use crate::storage::{EncryptedFileStorage, KeychainStorage, MemoryStorage, SecureStorage};

/// Default keychain service name
pub const DEFAULT_SERVICE_NAME: &str = "keychain-core";

/// Which storage backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    /// OS keychain
    #[default]
    Keychain,
    /// Password-protected file in `storage_dir`
    EncryptedFile,
    /// Process memory only
    Memory,
}

/// Keychain settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeychainSettings {
    /// Settings file version
    pub version: u32,
    pub backend: StorageBackend,
    /// Prefix for keychain service names
    pub service_name: String,
    /// Directory for the encrypted-file backend (platform data dir if unset)
    pub storage_dir: Option<PathBuf>,
    /// Use the encrypted file when the keychain is unreachable
    pub fallback_to_file: bool,
}

impl Default for KeychainSettings {
    fn default() -> Self {
        Self {
            version: 1,
            backend: StorageBackend::Keychain,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            storage_dir: None,
            fallback_to_file: true,
        }
    }
}

impl KeychainSettings {
    /// Load settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, path)?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    fn open_file_storage(
        &self,
        password: Option<&str>,
        params: KeyDerivationParams,
    ) -> Result<Arc<dyn SecureStorage>> {
        let storage = match &self.storage_dir {
            Some(dir) => EncryptedFileStorage::with_dir(dir.clone())?,
            None => EncryptedFileStorage::new()?,
        }
        .with_params(params);

        let password = password.ok_or(KeychainError::Locked)?;
        storage.unlock(password)?;
        Ok(Arc::new(storage))
    }
}

/// Open the backend described by `settings`.
///
/// The encrypted-file backend (directly or as keychain fallback) needs
/// `password`; without one it fails with `Locked`.
pub fn open_storage(
    settings: &KeychainSettings,
    password: Option<&str>,
) -> Result<Arc<dyn SecureStorage>> {
    open_storage_with_params(settings, password, KeyDerivationParams::default())
}

pub(crate) fn open_storage_with_params(
    settings: &KeychainSettings,
    password: Option<&str>,
    params: KeyDerivationParams,
) -> Result<Arc<dyn SecureStorage>> {
    match settings.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::EncryptedFile => settings.open_file_storage(password, params),
        StorageBackend::Keychain => {
            let keychain = KeychainStorage::new(&settings.service_name);
            if keychain.is_available() {
                info!("Using {}", keychain.backend_name());
                return Ok(Arc::new(keychain));
            }
            if !settings.fallback_to_file {
                return Err(KeychainError::KeychainUnavailable);
            }
            warn!("Keychain unavailable, falling back to encrypted file storage");
            settings.open_file_storage(password, params).map_err(|e| match e {
                KeychainError::Locked => KeychainError::KeychainUnavailable,
                other => other,
            })
        }
    }
}
