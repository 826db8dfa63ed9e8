//! Versioned user preferences persisted as a flat JSON object.

use crate::models::IntervalKind;
use crate::persistence::{self, LoadError, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Schema version stamped into every saved preferences file.
pub const PREFS_VERSION: &str = "v2";

/// Which autostart toggle a setting refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Autostart {
    /// Start the next pomodoro automatically after a break.
    Pomodoro,
    /// Start the next break automatically after a pomodoro.
    Break,
    /// Start the first pomodoro of a fresh session automatically.
    Session,
}

/// User-configurable settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preferences {
    /// Pomodoro length in seconds.
    pub pomodoro_length: u32,
    /// Short break length in seconds.
    pub break_length: u32,
    /// Long break length in seconds.
    pub long_length: u32,
    pub autostart_pomodoro: bool,
    pub autostart_break: bool,
    pub autostart_session: bool,
    /// Whether to play sounds on button presses and interval end.
    pub allow_sound: bool,
    /// Sound file played when an interval ends.
    pub timer_sound: String,
    pub version: String,
    /// Keys this version does not know about, kept so they survive a save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            pomodoro_length: 1500,
            break_length: 300,
            long_length: 900,
            autostart_pomodoro: true,
            autostart_break: true,
            autostart_session: false,
            allow_sound: true,
            timer_sound: "sounds/beep.mp3".to_string(),
            version: PREFS_VERSION.to_string(),
            extra: Map::new(),
        }
    }
}

impl Preferences {
    /// Interval length in seconds for `kind`.
    pub fn length(&self, kind: IntervalKind) -> u32 {
        match kind {
            IntervalKind::Pomodoro => self.pomodoro_length,
            IntervalKind::ShortBreak => self.break_length,
            IntervalKind::LongBreak => self.long_length,
        }
    }

    pub fn set_length(&mut self, kind: IntervalKind, secs: u32) {
        match kind {
            IntervalKind::Pomodoro => self.pomodoro_length = secs,
            IntervalKind::ShortBreak => self.break_length = secs,
            IntervalKind::LongBreak => self.long_length = secs,
        }
    }

    /// Whether an interval of `kind` starts on its own once loaded.
    pub fn autostart(&self, kind: IntervalKind) -> bool {
        match kind {
            IntervalKind::Pomodoro => self.autostart_pomodoro,
            IntervalKind::ShortBreak | IntervalKind::LongBreak => self.autostart_break,
        }
    }

    pub fn autostart_flag(&self, which: Autostart) -> bool {
        match which {
            Autostart::Pomodoro => self.autostart_pomodoro,
            Autostart::Break => self.autostart_break,
            Autostart::Session => self.autostart_session,
        }
    }

    pub fn toggle_autostart(&mut self, which: Autostart) {
        let flag = match which {
            Autostart::Pomodoro => &mut self.autostart_pomodoro,
            Autostart::Break => &mut self.autostart_break,
            Autostart::Session => &mut self.autostart_session,
        };
        *flag = !*flag;
    }

    /// Flat JSON object as stored on disk.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Builds preferences from a raw object. Missing keys, and keys whose
    /// value has the wrong type, take the value from `defaults`.
    pub fn from_map(mut map: Map<String, Value>, defaults: &Preferences) -> Self {
        let pomodoro_length = take(&mut map, "pomodoro_length", defaults.pomodoro_length);
        let break_length = take(&mut map, "break_length", defaults.break_length);
        let long_length = take(&mut map, "long_length", defaults.long_length);
        let autostart_pomodoro = take(&mut map, "autostart_pomodoro", defaults.autostart_pomodoro);
        let autostart_break = take(&mut map, "autostart_break", defaults.autostart_break);
        let autostart_session = take(&mut map, "autostart_session", defaults.autostart_session);
        let allow_sound = take(&mut map, "allow_sound", defaults.allow_sound);
        let timer_sound = take(&mut map, "timer_sound", defaults.timer_sound.clone());
        let version = take(&mut map, "version", defaults.version.clone());

        Self {
            pomodoro_length,
            break_length,
            long_length,
            autostart_pomodoro,
            autostart_break,
            autostart_session,
            allow_sound,
            timer_sound,
            version,
            extra: map,
        }
    }
}

fn take<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str, fallback: T) -> T {
    match map.remove(key) {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("Ignoring preference {}: {}", key, e);
            fallback
        }),
        None => fallback,
    }
}

/// Backfills keys missing from `loaded` with the values in `defaults` and
/// stamps the default version. Keys present in both keep the loaded value.
pub fn migrate(mut loaded: Map<String, Value>, defaults: &Map<String, Value>) -> Map<String, Value> {
    for (key, value) in defaults {
        if !loaded.contains_key(key) {
            loaded.insert(key.clone(), value.clone());
        }
    }
    if let Some(version) = defaults.get("version") {
        loaded.insert("version".to_string(), version.clone());
    }
    loaded
}

/// Result of loading preferences from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// File matched the current version.
    Current(Preferences),
    /// File was from another version and has been migrated.
    Migrated(Preferences),
    /// File was missing or unreadable; defaults are in use.
    Defaults(Preferences),
}

impl Loaded {
    pub fn into_inner(self) -> Preferences {
        match self {
            Self::Current(prefs) | Self::Migrated(prefs) | Self::Defaults(prefs) => prefs,
        }
    }

    /// Whether the in-memory value differs from what is on disk.
    pub fn needs_save(&self) -> bool {
        !matches!(self, Self::Current(_))
    }
}

/// Loads preferences, migrating them if they were saved by another version.
/// A file that exists but cannot be loaded is copied to `<path>.corrupt`
/// before defaults are returned.
pub fn load_versioned(path: &Path, defaults: &Preferences) -> Loaded {
    let map = match persistence::read_json_object(path) {
        Ok(map) => map,
        Err(LoadError::NotFound(_) | LoadError::Empty(_)) => {
            log::info!("No preferences at {}, using defaults", path.display());
            return Loaded::Defaults(defaults.clone());
        }
        Err(e) => {
            log::warn!("Could not load preferences, using defaults: {}", e);
            match persistence::back_up_corrupt(path) {
                Ok(backup) => log::warn!("Old preferences kept in {}", backup.display()),
                Err(e) => log::error!("Failed to back up preferences: {}", e),
            }
            return Loaded::Defaults(defaults.clone());
        }
    };

    let stored_version = map.get("version").and_then(Value::as_str);
    if stored_version == Some(defaults.version.as_str()) {
        return Loaded::Current(Preferences::from_map(map, defaults));
    }

    log::info!(
        "Migrating preferences from {} to {}",
        stored_version.unwrap_or("unversioned"),
        defaults.version
    );
    let migrated = migrate(map, &defaults.to_map());
    Loaded::Migrated(Preferences::from_map(migrated, defaults))
}

/// Loads preferences, returning `defaults` when the file is missing,
/// unparseable or empty.
pub fn load(path: &Path, defaults: &Preferences) -> Preferences {
    load_versioned(path, defaults).into_inner()
}

/// Overwrites the preferences file.
pub fn save(path: &Path, prefs: &Preferences) -> Result<(), StorageError> {
    persistence::write_json(path, &Value::Object(prefs.to_map()))
}

/// Preferences bound to their file; every change is written straight back.
pub struct PreferencesStore {
    path: PathBuf,
    prefs: Preferences,
}

impl PreferencesStore {
    /// Loads preferences from `path`, writing back migrated or default values.
    pub fn open(path: PathBuf) -> Self {
        let loaded = load_versioned(&path, &Preferences::default());
        let needs_save = loaded.needs_save();
        let prefs = loaded.into_inner();

        if needs_save {
            if let Err(e) = save(&path, &prefs) {
                log::error!("Failed to write preferences: {}", e);
            }
        }

        Self { path, prefs }
    }

    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    /// Applies `updater` and saves. The in-memory change is kept even when
    /// the write fails.
    pub fn update<F>(&mut self, updater: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Preferences),
    {
        updater(&mut self.prefs);
        save(&self.path, &self.prefs)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
