//! User settings: a TOML file with defaults for every key.
//!
//! The engine only ever sees an immutable [`Settings`] snapshot. The
//! [`SettingsStore`] owns the file: first-run detection, filling in defaults
//! for missing keys, and resetting.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TabkeeperError};

const DEFAULT_SETTINGS_RELATIVE_PATH: &str = ".tabkeeper/settings.toml";
pub const DEFAULT_ACTIVE_CHANGED_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 1000;

/// Where newly created tabs go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnOpen {
    #[default]
    Default,
    #[serde(alias = "nextToActive")]
    NextToActive,
    #[serde(alias = "atEnd")]
    AtEnd,
    /// Speed dial next to the active tab, everything else at the end.
    #[serde(alias = "otherAtEnd")]
    OtherAtEnd,
}

/// Which tab gets focus after the active tab is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnClose {
    #[default]
    Default,
    #[serde(alias = "lastfocused")]
    LastFocused,
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusOnOpen {
    #[default]
    Default,
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub on_open: OnOpen,
    pub open_in_order: bool,
    pub on_close: OnClose,
    pub focus_on_open: FocusOnOpen,
    pub except_ctrl: bool,
    pub except_shift: bool,
    pub prevent_new_window: bool,
    pub prevent_window_popups: bool,
    /// How long after an activation a removal still counts as "the active
    /// tab was just closed". Best-effort; the host gives no stronger signal.
    pub active_changed_timeout_ms: u64,
    pub startup_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            on_open: OnOpen::default(),
            open_in_order: false,
            on_close: OnClose::default(),
            focus_on_open: FocusOnOpen::default(),
            except_ctrl: false,
            except_shift: false,
            prevent_new_window: false,
            prevent_window_popups: false,
            active_changed_timeout_ms: DEFAULT_ACTIVE_CHANGED_TIMEOUT_MS,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
        }
    }
}

impl Settings {
    pub fn active_changed_timeout(&self) -> Duration {
        Duration::milliseconds(self.active_changed_timeout_ms.min(u64::from(u32::MAX)) as i64)
    }

    pub fn startup_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.startup_delay_ms)
    }

    /// Whether a popup opened from another tab should be pulled back into
    /// its opener's window.
    pub fn suppresses_popup(&self, shift_down: bool) -> bool {
        self.prevent_window_popups || (self.prevent_new_window && shift_down)
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(TabkeeperError::HomeDirNotFound)?;
    Ok(home.join(DEFAULT_SETTINGS_RELATIVE_PATH))
}

/// Loads settings from `path`, or the default location when `None`.
/// A missing file yields defaults.
pub fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let settings_path = match path {
        Some(path) => path,
        None => default_settings_path()?,
    };

    match read_table(&settings_path)? {
        Some(table) => parse_table(&settings_path, table),
        None => Ok(Settings::default()),
    }
}

/// File-backed settings with first-run detection.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
    first_run: bool,
    missing_keys: bool,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (settings, first_run, missing_keys) = match read_table(&path)? {
            Some(table) => {
                let missing_keys = has_missing_keys(&table)?;
                (parse_table(&path, table)?, false, missing_keys)
            }
            None => (Settings::default(), true, true),
        };

        Ok(Self {
            path,
            settings,
            first_run,
            missing_keys,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn first_run(&self) -> bool {
        self.first_run
    }

    /// Writes any keys the file is missing. On first run this creates the
    /// file with every default.
    pub fn init(&mut self) -> Result<()> {
        if self.missing_keys {
            self.save()?;
            self.missing_keys = false;
        }
        Ok(())
    }

    pub fn update(&mut self, settings: Settings) -> Result<()> {
        self.settings = settings;
        self.save()
    }

    pub fn reset_all(&mut self) -> Result<()> {
        self.update(Settings::default())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent).map_err(|source| TabkeeperError::ConfigWriteFailed {
                path: self.path.clone(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(&self.settings)?;
        let tmp_path = self.path.with_extension("tmp");
        fs_err::write(&tmp_path, content).map_err(|source| TabkeeperError::ConfigWriteFailed {
            path: self.path.clone(),
            source,
        })?;
        fs_err::rename(&tmp_path, &self.path).map_err(|source| {
            TabkeeperError::ConfigWriteFailed {
                path: self.path.clone(),
                source,
            }
        })
    }
}

fn read_table(path: &Path) -> Result<Option<toml::Table>> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(TabkeeperError::Io {
                context: format!("reading settings {}", path.display()),
                source,
            })
        }
    };

    content
        .parse::<toml::Table>()
        .map(Some)
        .map_err(|err| TabkeeperError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })
}

fn parse_table(path: &Path, table: toml::Table) -> Result<Settings> {
    Settings::deserialize(toml::Value::Table(table)).map_err(|err| {
        TabkeeperError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        }
    })
}

fn has_missing_keys(table: &toml::Table) -> Result<bool> {
    let defaults = toml::Value::try_from(Settings::default())?;
    Ok(defaults
        .as_table()
        .map(|defaults| defaults.keys().any(|key| !table.contains_key(key)))
        .unwrap_or(false))
}
