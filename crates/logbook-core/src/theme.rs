use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Stored theme preference. Persisted by ordinal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
    System,
    Battery,
}

impl ThemeMode {
    pub fn ordinal(self) -> u8 {
        match self {
            ThemeMode::Light => 0,
            ThemeMode::Dark => 1,
            ThemeMode::System => 2,
            ThemeMode::Battery => 3,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(ThemeMode::Light),
            1 => Some(ThemeMode::Dark),
            2 => Some(ThemeMode::System),
            3 => Some(ThemeMode::Battery),
            _ => None,
        }
    }
}

/// What the renderer is told to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NightMode {
    No,
    Yes,
    FollowSystem,
    AutoBattery,
}

/// The three choices offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeOption {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Whether the platform exposes a system-wide dark theme to follow.
    /// Without one, "system" falls back to following battery saver.
    pub follows_system_theme: bool,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            follows_system_theme: true,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ThemePayload {
    #[serde(default)]
    mode: i64,
}

/// Plain (unencrypted) theme preference file.
#[derive(Debug)]
pub struct ThemeSettings {
    path: PathBuf,
    mode: ThemeMode,
}

impl ThemeSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let ordinal = if path.exists() {
            let payload: ThemePayload = serde_json::from_slice(&fs::read(&path)?)?;
            payload.mode
        } else {
            0
        };
        let mode = u8::try_from(ordinal)
            .ok()
            .and_then(ThemeMode::from_ordinal)
            .unwrap_or_else(|| {
                warn!(ordinal, "unknown stored theme mode, using light");
                ThemeMode::Light
            });
        Ok(Self { path, mode })
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    /// Night mode to apply at start-up for the stored preference.
    pub fn night_mode(&self, platform: Platform) -> NightMode {
        match self.mode {
            ThemeMode::Light => NightMode::No,
            ThemeMode::Dark => NightMode::Yes,
            ThemeMode::System => system_night_mode(platform),
            ThemeMode::Battery => NightMode::AutoBattery,
        }
    }

    /// Option shown as selected. Battery is presented as "system".
    pub fn selected_option(&self) -> ThemeOption {
        match self.mode {
            ThemeMode::Light => ThemeOption::Light,
            ThemeMode::Dark => ThemeOption::Dark,
            ThemeMode::System | ThemeMode::Battery => ThemeOption::System,
        }
    }

    /// Persist a new choice and return the night mode to apply.
    pub fn switch_to(&mut self, option: ThemeOption, platform: Platform) -> Result<NightMode> {
        let (night_mode, mode) = match option {
            ThemeOption::Light => (NightMode::No, ThemeMode::Light),
            ThemeOption::Dark => (NightMode::Yes, ThemeMode::Dark),
            ThemeOption::System => (system_night_mode(platform), ThemeMode::System),
        };
        self.save(mode)?;
        self.mode = mode;
        debug!(?mode, ?night_mode, "theme switched");
        Ok(night_mode)
    }

    fn save(&self, mode: ThemeMode) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = ThemePayload {
            mode: i64::from(mode.ordinal()),
        };
        fs::write(&self.path, serde_json::to_vec(&payload)?)?;
        Ok(())
    }
}

fn system_night_mode(platform: Platform) -> NightMode {
    if platform.follows_system_theme {
        NightMode::FollowSystem
    } else {
        NightMode::AutoBattery
    }
}
