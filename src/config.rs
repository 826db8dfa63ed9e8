//! Fixed application configuration: file locations, menu options, messages.

use crate::models::IntervalKind;
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "Tomado";

/// Environment variable that overrides where prefs and stats are stored.
pub const DATA_DIR_ENV: &str = "TOMADO_DATA_DIR";

const PREFS_FILE: &str = "prefs.json";
const STATS_FILE: &str = "stats.json";

/// Length choices offered in the preferences menu, in minutes.
pub fn length_options(kind: IntervalKind) -> &'static [u32] {
    match kind {
        IntervalKind::Pomodoro => &[15, 20, 25, 30, 40, 45, 60],
        IntervalKind::ShortBreak => &[3, 5, 10, 15, 20],
        IntervalKind::LongBreak => &[10, 15, 20, 25, 30],
    }
}

/// Timer sounds offered in the preferences menu.
pub const SOUND_OPTIONS: [&str; 5] = ["Beep", "Birds", "Ding", "Cicadas", "Wood"];

/// Stored identifier for a sound option, e.g. `sounds/beep.mp3`.
pub fn sound_id(name: &str) -> String {
    format!("sounds/{}.mp3", name.to_lowercase())
}

/// Notification text shown when an interval of `kind` ends.
pub fn interval_end_message(kind: IntervalKind) -> &'static str {
    match kind {
        IntervalKind::Pomodoro => "Pomodoro is over. Take a break! 🪴",
        IntervalKind::ShortBreak => "Break has concluded. Time to focus! 🍅",
        IntervalKind::LongBreak => "Session is finished. Good job! 🌻",
    }
}

/// Where the app keeps its files.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub resource_dir: PathBuf,
}

impl AppConfig {
    /// Resolves directories from the environment and the platform defaults.
    pub fn from_env() -> Self {
        let data_dir = env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Self {
            data_dir,
            resource_dir: resource_dir(),
        }
    }

    /// Config rooted at `dir` (for testing).
    #[cfg(test)]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            data_dir: dir.to_path_buf(),
            resource_dir: dir.to_path_buf(),
        }
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join(PREFS_FILE)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join(STATS_FILE)
    }

    /// Absolute path of a bundled resource such as `sounds/beep.mp3`.
    pub fn resource(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.resource_dir.join(path)
        }
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "tomado", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `Contents/Resources` when running from an app bundle, else the
/// executable's directory.
fn resource_dir() -> PathBuf {
    let Ok(exe) = env::current_exe() else {
        return PathBuf::from(".");
    };
    let Some(exe_dir) = exe.parent() else {
        return PathBuf::from(".");
    };

    let bundled = exe_dir.join("..").join("Resources");
    if bundled.is_dir() {
        bundled
    } else {
        exe_dir.to_path_buf()
    }
}
