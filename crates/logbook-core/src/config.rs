use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keystore::{
    FileKeyStore, KeySpec, KeyStore, KeyringKeyStore, MemoryKeyStore, KEYRING_SERVICE_NAME,
};
use crate::paths::keys_dir;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreKind {
    Keyring,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogbookConfig {
    pub keystore: KeyStoreKind,
    pub keyring_service: String,
    pub master_key: KeySpec,
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            keystore: KeyStoreKind::Keyring,
            keyring_service: KEYRING_SERVICE_NAME.into(),
            master_key: KeySpec::default(),
        }
    }
}

impl LogbookConfig {
    /// Build the configured keystore. File keys live under `data_dir/keys`.
    pub fn build_keystore(&self, data_dir: &Path) -> Arc<dyn KeyStore> {
        match self.keystore {
            KeyStoreKind::Keyring => Arc::new(KeyringKeyStore::new(self.keyring_service.clone())),
            KeyStoreKind::File => Arc::new(FileKeyStore::new(keys_dir(data_dir))),
            KeyStoreKind::Memory => Arc::new(MemoryKeyStore::new()),
        }
    }
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<LogbookConfig> {
    if !path.exists() {
        return Ok(LogbookConfig::default());
    }
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn save_config(path: &Path, config: &LogbookConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(config)?)?;
    Ok(())
}
