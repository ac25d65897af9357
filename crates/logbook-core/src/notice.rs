use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notice {
    UnableToSaveEntry,
    UnableToDecrypt,
    UnableToDeleteEntry,
    UnableToListEntries,
    UnableToUpdateLogKey,
    LogKeyUnavailable,
    IncorrectLogKey,
    CurrentLogKeyIncorrect,
    LogKeySet,
    LogKeyCleared,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::UnableToSaveEntry => "Unable to save entry",
            Notice::UnableToDecrypt => "Unable to decrypt entry",
            Notice::UnableToDeleteEntry => "Unable to delete entry",
            Notice::UnableToListEntries => "Unable to list entries",
            Notice::UnableToUpdateLogKey => "Unable to update log key",
            Notice::LogKeyUnavailable => "Unable to read log key",
            Notice::IncorrectLogKey => "Incorrect log key",
            Notice::CurrentLogKeyIncorrect => "Current log key is incorrect",
            Notice::LogKeySet => "Log key set",
            Notice::LogKeyCleared => "Log key cleared",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Notice::LogKeySet | Notice::LogKeyCleared)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostedNotice {
    pub notice: Notice,
    pub posted_at: DateTime<Utc>,
}

/// Single-slot transient notification. A new notice replaces an
/// unacknowledged one.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    slot: Mutex<Option<PostedNotice>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, notice: Notice) {
        *self.slot.lock() = Some(PostedNotice {
            notice,
            posted_at: Utc::now(),
        });
    }

    pub fn current(&self) -> Option<PostedNotice> {
        self.slot.lock().clone()
    }

    /// Mark the current notice as shown and return it.
    pub fn acknowledge(&self) -> Option<PostedNotice> {
        self.slot.lock().take()
    }
}
