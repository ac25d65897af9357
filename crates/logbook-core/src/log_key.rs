//! Application-level log key.
//!
//! The log key only gates opening entries in the front end. It is not used
//! for encryption; it is kept in the encrypted prefs so it is not readable
//! at rest.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::escape::is_blank;
use crate::keystore::{KeySpec, KeyStore};
use crate::prefs::EncryptedPrefs;

pub const ENCRYPTED_PREFS: &str = "ENCRYPTED_PREFS";
pub const ENCRYPTED_PREFS_LOG_KEY: &str = "ENCRYPTED_PREFS_LOG_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKeyChange {
    Set,
    Cleared,
    CurrentIncorrect,
}

pub struct LogKeyGate {
    prefs: EncryptedPrefs,
}

impl LogKeyGate {
    pub fn new(prefs: EncryptedPrefs) -> Self {
        Self { prefs }
    }

    pub fn open<P: AsRef<Path>>(prefs_dir: P, keys: Arc<dyn KeyStore>, key_spec: KeySpec) -> Result<Self> {
        Ok(Self::new(EncryptedPrefs::open(
            prefs_dir,
            ENCRYPTED_PREFS,
            keys,
            key_spec,
        )?))
    }

    pub fn log_key(&self) -> Option<String> {
        self.prefs.get_string(ENCRYPTED_PREFS_LOG_KEY)
    }

    pub fn is_set(&self) -> bool {
        self.prefs.contains(ENCRYPTED_PREFS_LOG_KEY)
    }

    /// Replace the log key. `current` must match the stored key (`None` when
    /// no key is set). A blank or absent `new` clears the key.
    pub fn set_log_key(&self, current: Option<&str>, new: Option<&str>) -> Result<LogKeyChange> {
        if current != self.log_key().as_deref() {
            return Ok(LogKeyChange::CurrentIncorrect);
        }
        match new {
            Some(new) if !is_blank(new) => {
                self.prefs.put_string(ENCRYPTED_PREFS_LOG_KEY, Some(new))?;
                info!("log key set");
                Ok(LogKeyChange::Set)
            }
            _ => {
                self.prefs.put_string(ENCRYPTED_PREFS_LOG_KEY, None)?;
                info!("log key cleared");
                Ok(LogKeyChange::Cleared)
            }
        }
    }

    /// Whether an entry may be opened with `attempt`. Always true while no
    /// log key is set.
    pub fn authorize(&self, attempt: Option<&str>) -> bool {
        match self.log_key() {
            None => true,
            Some(key) => attempt == Some(key.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;
    use tempfile::{tempdir, TempDir};

    fn gate() -> (TempDir, LogKeyGate) {
        let dir = tempdir().unwrap();
        let gate =
            LogKeyGate::open(dir.path(), Arc::new(MemoryKeyStore::new()), KeySpec::default()).unwrap();
        (dir, gate)
    }

    #[test]
    fn no_key_allows_everything() {
        let (_dir, gate) = gate();
        assert!(!gate.is_set());
        assert!(gate.authorize(None));
        assert!(gate.authorize(Some("anything")));
    }

    #[test]
    fn set_then_authorize() {
        let (_dir, gate) = gate();
        assert_eq!(gate.set_log_key(None, Some("engage")).unwrap(), LogKeyChange::Set);
        assert_eq!(gate.log_key().as_deref(), Some("engage"));
        assert!(gate.authorize(Some("engage")));
        assert!(!gate.authorize(Some("Engage")));
        assert!(!gate.authorize(None));
    }

    #[test]
    fn wrong_current_key_changes_nothing() {
        let (_dir, gate) = gate();
        gate.set_log_key(None, Some("engage")).unwrap();
        assert_eq!(
            gate.set_log_key(Some("warp"), Some("new")).unwrap(),
            LogKeyChange::CurrentIncorrect
        );
        assert_eq!(
            gate.set_log_key(None, Some("new")).unwrap(),
            LogKeyChange::CurrentIncorrect
        );
        assert_eq!(gate.log_key().as_deref(), Some("engage"));
    }

    #[test]
    fn blank_new_key_clears() {
        let (_dir, gate) = gate();
        gate.set_log_key(None, Some("engage")).unwrap();
        assert_eq!(
            gate.set_log_key(Some("engage"), Some("  ")).unwrap(),
            LogKeyChange::Cleared
        );
        assert!(!gate.is_set());
        gate.set_log_key(None, Some("again")).unwrap();
        assert_eq!(gate.set_log_key(Some("again"), None).unwrap(), LogKeyChange::Cleared);
        assert!(gate.authorize(None));
    }

    #[test]
    fn key_persists_across_gates() {
        let dir = tempdir().unwrap();
        let keys: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        LogKeyGate::open(dir.path(), keys.clone(), KeySpec::default())
            .unwrap()
            .set_log_key(None, Some("engage"))
            .unwrap();
        let reopened = LogKeyGate::open(dir.path(), keys, KeySpec::default()).unwrap();
        assert_eq!(reopened.log_key().as_deref(), Some("engage"));
    }
}
