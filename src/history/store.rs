//! Watch-history file store
//!
//! A history is a sorted JSON array of every identifier seen so far. Saves go
//! through a temporary file in the same directory and replace the old file only
//! once the new one is fully written.

use crate::history::HistoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name prefix of persisted watch histories
pub const HISTORY_FILE_PREFIX: &str = "watchHistory_";

/// Path of the history file for the watch list `list` stored in `dir`
pub fn history_path(dir: &Path, list: &str) -> PathBuf {
    dir.join(format!("{}{}.json", HISTORY_FILE_PREFIX, list))
}

/// Set of previously observed item identifiers
///
/// Serialized as a flat JSON array in sorted order, so saving the same set twice
/// produces identical files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchHistory {
    ids: BTreeSet<String>,
}

impl WatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a history file
    ///
    /// # Returns
    ///
    /// * `Ok(WatchHistory)` - The stored set, or an empty set if the file does not exist
    /// * `Err(HistoryError)` - The file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No watch history yet");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(HistoryError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let history: Self =
            serde_json::from_str(&content).map_err(|source| HistoryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), ids = history.len(), "Loaded watch history");
        Ok(history)
    }

    /// Replaces the file at `path` with this history
    ///
    /// The content is written to a temporary file in the same directory which is then
    /// renamed over `path`, so a failed save leaves the previous file untouched.
    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        let write_error = |source: io::Error| HistoryError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(&json).map_err(write_error)?;
        staged.write_all(b"\n").map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged.persist(path).map_err(|e| write_error(e.error))?;

        tracing::debug!(path = %path.display(), ids = self.len(), "Saved watch history");
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Records an identifier; returns false if it was already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for WatchHistory {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}
