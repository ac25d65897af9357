use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::crypto::{decrypt, encrypt};
use crate::error::{LogbookError, Result};
use crate::escape::{self, file_name_for};
use crate::keystore::{KeySpec, KeyStore};

/// Encrypted log entries, one file per stardate inside `dir`.
///
/// Callers serialise access per stardate; the store does no locking and
/// writes are not transactional.
pub struct EntryStore {
    dir: PathBuf,
    keys: Arc<dyn KeyStore>,
    key_spec: KeySpec,
}

impl EntryStore {
    pub fn open<P: AsRef<Path>>(dir: P, keys: Arc<dyn KeyStore>, key_spec: KeySpec) -> Result<Self> {
        key_spec.validate()?;
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            keys,
            key_spec,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `body` under `stardate`, replacing whatever was stored there.
    pub fn put(&self, stardate: &str, body: &str) -> Result<()> {
        self.put_replacing(stardate, body, stardate)
    }

    /// Write `body` under `stardate` after removing the entry previously
    /// stored as `existing`, so an edit that changes the stardate moves it.
    ///
    /// A blank `stardate` is rejected before anything is touched. Once the
    /// old entries are removed there is no rollback: a failed write leaves
    /// neither the old nor the new entry on disk.
    pub fn put_replacing(&self, stardate: &str, body: &str, existing: &str) -> Result<()> {
        let name = file_name_for(stardate)?;
        self.delete(existing)?;
        if existing != stardate {
            self.delete(stardate)?;
        }

        let key = self.keys.get_or_create(&self.key_spec)?;
        let ciphertext = encrypt(&key, body.as_bytes(), name.as_bytes())?;
        let path = self.dir.join(&name);
        let mut file = File::create(&path)?;
        file.write_all(&ciphertext)?;
        file.flush()?;
        debug!(stardate, bytes = ciphertext.len(), "entry written");
        Ok(())
    }

    pub fn get(&self, stardate: &str) -> Result<String> {
        let name = file_name_for(stardate)?;
        let ciphertext = fs::read(self.dir.join(&name))?;
        let key = self.keys.get_or_create(&self.key_spec)?;
        let plaintext = decrypt(&key, &ciphertext, name.as_bytes())?;
        String::from_utf8(plaintext.to_vec()).map_err(|e| {
            LogbookError::Storage(io::Error::new(io::ErrorKind::InvalidData, e.utf8_error()))
        })
    }

    pub fn contains(&self, stardate: &str) -> bool {
        file_name_for(stardate)
            .map(|name| self.dir.join(name).is_file())
            .unwrap_or(false)
    }

    /// Remove an entry. Blank or unknown stardates are a no-op.
    pub fn delete(&self, stardate: &str) -> Result<()> {
        let name = match file_name_for(stardate) {
            Ok(name) => name,
            Err(LogbookError::Validation(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        match fs::remove_file(self.dir.join(name)) {
            Ok(()) => {
                debug!(stardate, "entry deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stardates of all stored entries, sorted. Files whose names are not
    /// escaped stardates are skipped.
    pub fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let file_name = dir_entry.file_name();
            match file_name.to_str().and_then(escape::unescape) {
                Some(id) => ids.push(id),
                None => warn!(file = ?file_name, "skipping foreign file in entries directory"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use crate::keystore::MemoryKeyStore;
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, EntryStore) {
        let dir = tempdir().unwrap();
        let store = EntryStore::open(
            dir.path().join("entries"),
            Arc::new(MemoryKeyStore::new()),
            KeySpec::default(),
        )
        .unwrap();
        (dir, store)
    }

    fn file_count(store: &EntryStore) -> usize {
        fs::read_dir(store.dir()).unwrap().count()
    }

    #[test]
    fn put_then_get_returns_body() {
        let (_dir, store) = store();
        store.put("2259.42", "Captain's log...").unwrap();
        assert_eq!(store.get("2259.42").unwrap(), "Captain's log...");
    }

    #[test]
    fn bodies_roundtrip_exactly() {
        let (_dir, store) = store();
        let long = "The ship holds together. ".repeat(1_000);
        for (id, body) in [
            ("empty", ""),
            ("unicode", "Ωmega ✨ Föhn\n\ttabs"),
            ("long", long.as_str()),
        ] {
            store.put(id, body).unwrap();
            assert_eq!(store.get(id).unwrap(), body, "{id}");
        }
    }

    #[test]
    fn file_on_disk_is_not_plaintext() {
        let (_dir, store) = store();
        store.put("2259.42", "secret coordinates").unwrap();
        let raw = fs::read(store.dir().join("2259.42")).unwrap();
        let needle = b"secret coordinates";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn blank_put_leaves_store_unchanged() {
        let (_dir, store) = store();
        store.put("2259.42", "kept").unwrap();
        for blank in ["", "   ", "\t"] {
            let err = store.put(blank, "text").unwrap_err();
            assert!(matches!(err, LogbookError::Validation(_)));
        }
        let err = store.put_replacing("", "text", "2259.42").unwrap_err();
        assert!(matches!(err, LogbookError::Validation(_)));
        assert_eq!(file_count(&store), 1);
        assert_eq!(store.get("2259.42").unwrap(), "kept");
    }

    #[test]
    fn put_overwrites_last_write_wins() {
        let (_dir, store) = store();
        store.put("2259.42", "first").unwrap();
        store.put("2259.42", "second").unwrap();
        assert_eq!(store.get("2259.42").unwrap(), "second");
        assert_eq!(file_count(&store), 1);
    }

    #[test]
    fn put_replacing_moves_renamed_entry() {
        let (_dir, store) = store();
        store.put("2259.42", "draft").unwrap();
        store.put_replacing("2259.43", "final", "2259.42").unwrap();
        assert_eq!(store.list_ids().unwrap(), vec!["2259.43".to_string()]);
        assert_eq!(store.get("2259.43").unwrap(), "final");
    }

    #[test]
    fn delete_missing_or_blank_is_noop() {
        let (_dir, store) = store();
        store.delete("never-written").unwrap();
        store.delete("").unwrap();
        store.delete(&"x".repeat(400)).unwrap();
    }

    #[test]
    fn get_after_delete_fails() {
        let (_dir, store) = store();
        store.put("2259.42", "gone soon").unwrap();
        store.delete("2259.42").unwrap();
        let err = store.get("2259.42").unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.contains("2259.42"));
    }

    #[test]
    fn tampered_ciphertext_fails_integrity_check() {
        let (_dir, store) = store();
        store.put("2259.42", "Captain's log...").unwrap();
        let path = store.dir().join("2259.42");
        let mut raw = fs::read(&path).unwrap();
        let middle = raw.len() / 2;
        raw[middle] ^= 0x80;
        fs::write(&path, raw).unwrap();
        assert!(matches!(
            store.get("2259.42"),
            Err(LogbookError::Crypto(CryptoError::AeadDecrypt))
        ));
    }

    #[test]
    fn truncated_write_fails_integrity_check() {
        let (_dir, store) = store();
        store.put("2259.42", &"x".repeat(9_000)).unwrap();
        let path = store.dir().join("2259.42");
        let raw = fs::read(&path).unwrap();
        fs::write(&path, &raw[..raw.len() - 100]).unwrap();
        assert!(matches!(store.get("2259.42"), Err(LogbookError::Crypto(_))));
    }

    #[test]
    fn renamed_file_does_not_decrypt_under_new_name() {
        let (_dir, store) = store();
        store.put("2259.42", "bound to its name").unwrap();
        fs::rename(store.dir().join("2259.42"), store.dir().join("2259.43")).unwrap();
        assert!(matches!(store.get("2259.43"), Err(LogbookError::Crypto(_))));
    }

    #[test]
    fn entries_from_another_key_are_unreadable() {
        let dir = tempdir().unwrap();
        let first = EntryStore::open(dir.path(), Arc::new(MemoryKeyStore::new()), KeySpec::default())
            .unwrap();
        first.put("2259.42", "first install").unwrap();
        let second = EntryStore::open(dir.path(), Arc::new(MemoryKeyStore::new()), KeySpec::default())
            .unwrap();
        assert!(matches!(second.get("2259.42"), Err(LogbookError::Crypto(_))));
    }

    #[test]
    fn list_ids_unescapes_and_skips_foreign_files() {
        let (_dir, store) = store();
        for id in ["2259.42", "a/b", ".hidden", "50%"] {
            store.put(id, "body").unwrap();
        }
        fs::write(store.dir().join(".DS_Store"), b"junk").unwrap();
        fs::create_dir(store.dir().join("nested")).unwrap();
        assert_eq!(
            store.list_ids().unwrap(),
            vec![".hidden", "2259.42", "50%", "a/b"]
        );
    }

    #[test]
    fn stardates_differing_in_case_get_distinct_files() {
        let (_dir, store) = store();
        store.put("Log", "upper").unwrap();
        store.put("log", "lower").unwrap();
        let names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_ascii_lowercase())
            .collect();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        assert_eq!(store.get("Log").unwrap(), "upper");
        assert_eq!(store.get("log").unwrap(), "lower");
    }
}
