use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::crypto::{decrypt, encrypt};
use crate::error::{LogbookError, Result};
use crate::keystore::{KeySpec, KeyStore};

const PREFS_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PrefsPayload {
    version: u32,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Namespaces are fixed identifiers and name their file verbatim.
fn namespace_file_name(namespace: &str) -> Result<&str> {
    let valid = !namespace.is_empty()
        && namespace
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid {
        return Err(LogbookError::Validation(format!(
            "prefs namespace {namespace:?} must be ASCII letters, digits, '_' or '-'"
        )));
    }
    Ok(namespace)
}

/// Encrypted string map persisted as a single file per namespace.
///
/// The whole map is encrypted with the namespace as associated data and
/// replaced atomically on every change.
pub struct EncryptedPrefs {
    path: PathBuf,
    namespace: String,
    keys: Arc<dyn KeyStore>,
    key_spec: KeySpec,
    values: RwLock<BTreeMap<String, String>>,
}

impl EncryptedPrefs {
    pub fn open<P: AsRef<Path>>(
        dir: P,
        namespace: &str,
        keys: Arc<dyn KeyStore>,
        key_spec: KeySpec,
    ) -> Result<Self> {
        key_spec.validate()?;
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(namespace_file_name(namespace)?);
        let values = if path.exists() {
            let ciphertext = fs::read(&path)?;
            let key = keys.get_or_create(&key_spec)?;
            let plaintext = decrypt(&key, &ciphertext, namespace.as_bytes())?;
            let payload: PrefsPayload = serde_json::from_slice(&plaintext)?;
            debug!(namespace, entries = payload.values.len(), "prefs loaded");
            payload.values
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            namespace: namespace.to_string(),
            keys,
            key_spec,
            values: RwLock::new(values),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    /// Store `value` under `name`; `None` removes the entry.
    pub fn put_string(&self, name: &str, value: Option<&str>) -> Result<()> {
        let mut values = self.values.write();
        let previous = match value {
            Some(value) => values.insert(name.to_string(), value.to_string()),
            None => values.remove(name),
        };
        if let Err(e) = self.commit(&values) {
            // keep memory consistent with what is on disk
            match previous {
                Some(previous) => values.insert(name.to_string(), previous),
                None => values.remove(name),
            };
            return Err(e);
        }
        Ok(())
    }

    fn commit(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let payload = PrefsPayload {
            version: PREFS_FORMAT_VERSION,
            values: values.clone(),
        };
        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(&payload)?);
        let key = self.keys.get_or_create(&self.key_spec)?;
        let ciphertext = encrypt(&key, &plaintext, self.namespace.as_bytes())?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&ciphertext)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(namespace = %self.namespace, "prefs committed");
        Ok(())
    }
}
