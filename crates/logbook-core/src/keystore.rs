use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crypto::MasterKey;
use crate::error::CryptoError;
use crate::escape;

pub const DEFAULT_MASTER_KEY_ALIAS: &str = "master_key";
pub const KEYRING_SERVICE_NAME: &str = "CaptainsLogbook";
pub const MASTER_KEY_SIZE_BITS: u32 = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockMode {
    Gcm,
    Cbc,
}

/// Parameters for obtaining or creating the master key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeySpec {
    pub alias: String,
    pub key_size_bits: u32,
    pub block_mode: BlockMode,
    /// The key may only be used while the user session is unlocked.
    pub unlocked_device_required: bool,
    /// Prefer isolated secure hardware; ignored by backends without it.
    pub secure_hardware_preferred: bool,
}

impl KeySpec {
    pub fn aes256_gcm(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            key_size_bits: MASTER_KEY_SIZE_BITS,
            block_mode: BlockMode::Gcm,
            unlocked_device_required: true,
            secure_hardware_preferred: true,
        }
    }

    pub fn validate(&self) -> Result<(), CryptoError> {
        if escape::is_blank(&self.alias) {
            return Err(CryptoError::UnsupportedKeySpec("alias must not be blank".into()));
        }
        if self.key_size_bits != MASTER_KEY_SIZE_BITS {
            return Err(CryptoError::UnsupportedKeySpec(format!(
                "key size {} bits, only {MASTER_KEY_SIZE_BITS} is supported",
                self.key_size_bits
            )));
        }
        if self.block_mode != BlockMode::Gcm {
            return Err(CryptoError::UnsupportedKeySpec(
                "only authenticated GCM mode is supported".into(),
            ));
        }
        Ok(())
    }
}

impl Default for KeySpec {
    fn default() -> Self {
        Self::aes256_gcm(DEFAULT_MASTER_KEY_ALIAS)
    }
}

/// Holder of named master keys. Implementations create a key on first use
/// and return the same key for the same alias afterwards.
pub trait KeyStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_secure_hardware(&self) -> bool {
        false
    }

    fn get_or_create(&self, spec: &KeySpec) -> Result<MasterKey, CryptoError>;

    fn delete(&self, alias: &str) -> Result<(), CryptoError>;
}

fn check_spec(store: &dyn KeyStore, spec: &KeySpec) -> Result<(), CryptoError> {
    spec.validate()?;
    if spec.secure_hardware_preferred && !store.is_secure_hardware() {
        debug!(
            keystore = store.name(),
            alias = %spec.alias,
            "secure hardware not available, using software-backed key"
        );
    }
    Ok(())
}

fn decode_key(encoded: &str) -> Result<MasterKey, CryptoError> {
    let bytes = zeroize::Zeroizing::new(general_purpose::STANDARD.decode(encoded.trim())?);
    MasterKey::from_slice(&bytes)
}

fn encode_key(key: &MasterKey) -> zeroize::Zeroizing<String> {
    zeroize::Zeroizing::new(general_purpose::STANDARD.encode(key.as_bytes()))
}

/// Master keys kept in the platform credential store (Secret Service,
/// Keychain, Credential Manager). The session must be unlocked to read them.
pub struct KeyringKeyStore {
    service: String,
}

impl KeyringKeyStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, alias: &str) -> Result<Entry, CryptoError> {
        Entry::new(&self.service, alias)
            .map_err(|e| CryptoError::KeyUnavailable(format!("keyring init: {e}")))
    }
}

impl Default for KeyringKeyStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE_NAME)
    }
}

impl KeyStore for KeyringKeyStore {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn get_or_create(&self, spec: &KeySpec) -> Result<MasterKey, CryptoError> {
        check_spec(self, spec)?;
        let entry = self.entry(&spec.alias)?;
        match entry.get_password() {
            Ok(encoded) => decode_key(&encoded),
            Err(keyring::Error::NoEntry) => {
                let key = MasterKey::generate();
                entry
                    .set_password(&encode_key(&key))
                    .map_err(|e| CryptoError::KeyUnavailable(format!("store master key: {e}")))?;
                info!(alias = %spec.alias, "created master key in OS keyring");
                Ok(key)
            }
            Err(e) => Err(CryptoError::KeyUnavailable(format!("load master key: {e}"))),
        }
    }

    fn delete(&self, alias: &str) -> Result<(), CryptoError> {
        match self.entry(alias)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CryptoError::KeyUnavailable(format!("delete master key: {e}"))),
        }
    }
}

/// Software fallback: one base64 key file per alias, readable by the owner
/// only. For machines without a usable credential store.
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, alias: &str) -> Result<PathBuf, CryptoError> {
        let name = escape::file_name_for(alias)
            .map_err(|e| CryptoError::UnsupportedKeySpec(e.to_string()))?;
        Ok(self.dir.join(name))
    }

    fn read_key(path: &Path) -> Result<MasterKey, CryptoError> {
        let encoded = zeroize::Zeroizing::new(
            fs::read_to_string(path)
                .map_err(|e| CryptoError::KeyUnavailable(format!("read key file: {e}")))?,
        );
        decode_key(&encoded)
    }

    fn create_key(path: &Path) -> std::io::Result<MasterKey> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        let key = MasterKey::generate();
        file.write_all(encode_key(&key).as_bytes())?;
        file.flush()?;
        Ok(key)
    }
}

impl KeyStore for FileKeyStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get_or_create(&self, spec: &KeySpec) -> Result<MasterKey, CryptoError> {
        check_spec(self, spec)?;
        if spec.unlocked_device_required {
            debug!(alias = %spec.alias, "file keystore cannot enforce session unlock");
        }
        let path = self.key_path(&spec.alias)?;
        if path.exists() {
            return Self::read_key(&path);
        }
        fs::create_dir_all(&self.dir)
            .map_err(|e| CryptoError::KeyUnavailable(format!("create key dir: {e}")))?;
        match Self::create_key(&path) {
            Ok(key) => {
                info!(alias = %spec.alias, path = %path.display(), "created master key file");
                Ok(key)
            }
            // lost a race with another process creating the same alias
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Self::read_key(&path),
            Err(e) => Err(CryptoError::KeyUnavailable(format!("create key file: {e}"))),
        }
    }

    fn delete(&self, alias: &str) -> Result<(), CryptoError> {
        let path = self.key_path(alias)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CryptoError::KeyUnavailable(format!("delete key file: {e}"))),
        }
    }
}

/// Process-local keys; everything encrypted with them is unreadable once the
/// process exits.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, MasterKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_or_create(&self, spec: &KeySpec) -> Result<MasterKey, CryptoError> {
        check_spec(self, spec)?;
        let mut keys = self.keys.lock();
        Ok(keys
            .entry(spec.alias.clone())
            .or_insert_with(MasterKey::generate)
            .clone())
    }

    fn delete(&self, alias: &str) -> Result<(), CryptoError> {
        self.keys.lock().remove(alias);
        Ok(())
    }
}
