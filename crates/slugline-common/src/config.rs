//! JSON-backed configuration storage.

use std::fs;
use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, WrapErr};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SluglineError;

/// The trait for loading configuration data.
pub trait Loader<T> {
    /// Loads the configuration data.
    fn load(&self) -> Result<T, SluglineError>;
}

/// The trait for saving configuration data.
pub trait Saver<T> {
    /// Saves the configuration data.
    fn save(&self, value: &T) -> Result<(), SluglineError>;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl<T: DeserializeOwned> Loader<T> for FileStore {
    fn load(&self) -> Result<T, SluglineError> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl<T: Serialize> Saver<T> for FileStore {
    fn save(&self, value: &T) -> Result<(), SluglineError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Load configuration through `loader`, falling back to `T::default()` when
/// the store holds nothing yet.
pub fn load_or_default<T, L>(loader: &L, exists: bool) -> miette::Result<T>
where
    T: Default,
    L: Loader<T>,
{
    if !exists {
        tracing::debug!("no configuration found, using defaults");
        return Ok(T::default());
    }
    loader
        .load()
        .into_diagnostic()
        .wrap_err("Failed to load configuration")
}

/// Parse configuration from a JSON string.
pub fn from_json_str<T: DeserializeOwned>(json: &str) -> Result<T, SluglineError> {
    Ok(serde_json::from_str(json)?)
}
