//! Boundary between the front end and storage.
//!
//! Every storage, crypto or key failure is logged here and turned into a
//! single [`Notice`]; none of them propagate further. A blank stardate is
//! not a failure and is dropped silently.
//!
//! If the log key cannot be loaded the journal still opens: entries can be
//! written, listed and deleted, but gated reads and log key changes are
//! refused until the key is readable again.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::LogbookConfig;
use crate::entry_store::EntryStore;
use crate::error::{LogbookError, Result};
use crate::escape::is_blank;
use crate::keystore::KeyStore;
use crate::log_key::{LogKeyChange, LogKeyGate};
use crate::notice::{Notice, NoticeBoard};
use crate::paths::{entries_dir, prefs_dir};

pub struct Journal {
    entries: EntryStore,
    gate: Option<LogKeyGate>,
    notices: NoticeBoard,
}

impl Journal {
    pub fn new(entries: EntryStore, gate: LogKeyGate) -> Self {
        Self {
            entries,
            gate: Some(gate),
            notices: NoticeBoard::new(),
        }
    }

    /// Construct the journal rooted at `data_dir` with an explicit keystore.
    pub fn open(data_dir: &Path, config: &LogbookConfig, keys: Arc<dyn KeyStore>) -> Result<Self> {
        let entries = EntryStore::open(entries_dir(data_dir), keys.clone(), config.master_key.clone())?;
        let gate = match LogKeyGate::open(prefs_dir(data_dir), keys, config.master_key.clone()) {
            Ok(gate) => Some(gate),
            Err(e) => {
                error!(kind = ?e.kind(), error = %e, "log key unavailable, gated reads refused");
                None
            }
        };
        Ok(Self {
            entries,
            gate,
            notices: NoticeBoard::new(),
        })
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    fn report(&self, operation: &str, err: &LogbookError, notice: Notice) {
        error!(operation, kind = ?err.kind(), error = %err, "journal operation failed");
        self.notices.post(notice);
    }

    /// Save an entry, moving it from `existing` when the stardate changed.
    /// Returns whether the entry was written.
    pub fn save_entry(&self, stardate: &str, body: &str, existing: &str) -> bool {
        match self.entries.put_replacing(stardate, body, existing) {
            Ok(()) => true,
            Err(e) if is_blank(stardate) => {
                debug!(error = %e, "blank stardate, save ignored");
                false
            }
            Err(e) => {
                self.report("save", &e, Notice::UnableToSaveEntry);
                false
            }
        }
    }

    /// Decrypted body, or an empty string after posting a notice.
    pub fn read_entry(&self, stardate: &str) -> String {
        match self.entries.get(stardate) {
            Ok(body) => body,
            Err(e) => {
                self.report("read", &e, Notice::UnableToDecrypt);
                String::new()
            }
        }
    }

    pub fn delete_entry(&self, stardate: &str) {
        if let Err(e) = self.entries.delete(stardate) {
            self.report("delete", &e, Notice::UnableToDeleteEntry);
        }
    }

    pub fn has_entry(&self, stardate: &str) -> bool {
        self.entries.contains(stardate)
    }

    pub fn stardates(&self) -> Vec<String> {
        self.entries.list_ids().unwrap_or_else(|e| {
            self.report("list", &e, Notice::UnableToListEntries);
            Vec::new()
        })
    }

    /// Whether a log key is set. False when the key could not be loaded;
    /// [`Journal::log_key_available`] tells the two apart.
    pub fn log_key_set(&self) -> bool {
        self.gate.as_ref().is_some_and(LogKeyGate::is_set)
    }

    pub fn log_key_available(&self) -> bool {
        self.gate.is_some()
    }

    fn gate(&self) -> Option<&LogKeyGate> {
        if self.gate.is_none() {
            self.notices.post(Notice::LogKeyUnavailable);
        }
        self.gate.as_ref()
    }

    /// Open an entry through the log key gate. `None` when the attempt is
    /// refused.
    pub fn open_entry(&self, stardate: &str, attempt: Option<&str>) -> Option<String> {
        let gate = self.gate()?;
        if !gate.authorize(attempt) {
            self.notices.post(Notice::IncorrectLogKey);
            return None;
        }
        Some(self.read_entry(stardate))
    }

    pub fn change_log_key(&self, current: Option<&str>, new: Option<&str>) -> Option<LogKeyChange> {
        let gate = self.gate()?;
        match gate.set_log_key(current, new) {
            Ok(change) => {
                self.notices.post(match change {
                    LogKeyChange::Set => Notice::LogKeySet,
                    LogKeyChange::Cleared => Notice::LogKeyCleared,
                    LogKeyChange::CurrentIncorrect => Notice::CurrentLogKeyIncorrect,
                });
                Some(change)
            }
            Err(e) => {
                self.report("change log key", &e, Notice::UnableToUpdateLogKey);
                None
            }
        }
    }
}
