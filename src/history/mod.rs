//! Watch-history persistence
//!
//! The watch history is the set of every item identifier observed for one watch
//! list. It is loaded once at batch start, grown in place while results arrive and
//! written back once at batch end.

mod store;

pub use store::{history_path, WatchHistory, HISTORY_FILE_PREFIX};

use std::path::PathBuf;
use thiserror::Error;

/// Watch-history persistence errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to read watch history {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Watch history {path} is not an identifier array: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write watch history {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
