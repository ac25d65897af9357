//! logbook-core: encrypted captain's log storage and the screens around it
//!
//! # Storage model
//! - One file per log entry, named by the escaped stardate.
//! - File contents are AES-256-GCM segments under a per-file key derived with
//!   HKDF-SHA256 from a keystore-held master key.
//! - The optional log key lives in a separate encrypted key-value file.
//!
//! # Module layout
//! - `crypto`        master key type, segmented AEAD file format
//! - `keystore`      master key specs and keystore backends (OS keyring, file, memory)
//! - `escape`        injective stardate → file name escaping
//! - `entry_store`   put / get / delete / list of encrypted entries
//! - `prefs`         encrypted key-value store
//! - `log_key`       application-level log key gate
//! - `notice`        transient user-facing notices
//! - `journal`       boundary facade that turns failures into notices
//! - `theme`         light / dark / system theme preference
//! - `config`, `paths`  configuration file and directory layout
//! - `mvi`           intent → action → outcome → state runtime
//! - `creatures`     creature tracker screens built on `mvi`
//! - `error`         error taxonomy

pub mod config;
pub mod creatures;
pub mod crypto;
pub mod entry_store;
pub mod error;
pub mod escape;
pub mod journal;
pub mod keystore;
pub mod log_key;
pub mod mvi;
pub mod notice;
pub mod paths;
pub mod prefs;
pub mod theme;

pub use entry_store::EntryStore;
pub use error::{CryptoError, LogbookError};
pub use journal::Journal;
