use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "logbook";
pub const APP_NAME: &str = "captains-log";
pub const DATA_DIR_ENV: &str = "LOGBOOK_DATA_DIR";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(override_path) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn entries_dir(data: &Path) -> PathBuf {
    data.join("entries")
}

pub fn prefs_dir(data: &Path) -> PathBuf {
    data.join("prefs")
}

pub fn keys_dir(data: &Path) -> PathBuf {
    data.join("keys")
}

pub fn theme_prefs_path(data: &Path) -> PathBuf {
    prefs_dir(data).join("theme.json")
}

pub fn creatures_path(data: &Path) -> PathBuf {
    data.join("creatures.json")
}

pub fn config_path(data: &Path) -> PathBuf {
    data.join("config.json")
}
