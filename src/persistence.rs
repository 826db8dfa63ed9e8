//! JSON file persistence shared by the preferences store and the stats ledger.
//!
//! Every write replaces the whole file. The new content goes to a temporary
//! file in the same directory which is then renamed over the target, so an
//! interrupted write never leaves a truncated file behind.

use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Why a JSON file could not be loaded. Callers fall back to defaults on
/// every variant.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("File is empty: {0}")]
    Empty(PathBuf),
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Expected a JSON object in {0}")]
    NotAnObject(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads a file holding a single JSON object. Content that is not valid
/// UTF-8 is reported as a parse error.
pub fn read_json_object(path: &Path) -> Result<Map<String, Value>, LoadError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LoadError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    let value: Value = serde_json::from_slice(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(map) if map.is_empty() => Err(LoadError::Empty(path.to_path_buf())),
        Value::Object(map) => Ok(map),
        _ => Err(LoadError::NotAnObject(path.to_path_buf())),
    }
}

/// Copies an unloadable file to `<path>.corrupt` so the next write does not
/// destroy it. Returns the backup path.
pub fn back_up_corrupt(path: &Path) -> io::Result<PathBuf> {
    let mut backup = path.to_path_buf().into_os_string();
    backup.push(".corrupt");
    let backup = PathBuf::from(backup);
    fs::copy(path, &backup)?;
    Ok(backup)
}

/// Overwrites `path` with `value` pretty-printed with a 2-space indent.
pub fn write_json(path: &Path, value: &Value) -> Result<(), StorageError> {
    let serialized = serde_json::to_string_pretty(value)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| StorageError::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })?;

    let write_err = |source: io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(serialized.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
