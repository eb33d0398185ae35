//! JSON snapshot files in the state directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::CliError;

/// One JSON document at `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// A store named `name` inside `dir`.
    #[must_use]
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{name}.json")),
        }
    }

    /// The file backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, CliError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            CliError::Config(format!("{}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "snapshot loaded");
        Ok(Some(value))
    }

    /// Writes the document through a temporary file and a rename, so a
    /// crash never leaves a half-written snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), CliError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}
