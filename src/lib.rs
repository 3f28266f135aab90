//! Watchlist: reports listings that were not seen on a previous run
//!
//! This crate fetches a batch of remote listing pages concurrently, extracts item
//! identifiers from each page and diffs them against a persisted watch history so
//! that only new listings end up in the report.

pub mod batch;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod history;
pub mod output;
pub mod sites;

use thiserror::Error;

/// Main error type for watchlist operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] fetch::FetchError),

    #[error("Watch history error: {0}")]
    Persistence(#[from] history::HistoryError),

    #[error("Report error: {0}")]
    Report(#[from] output::ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot read input list {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for watchlist operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use batch::{run_watch_list, BatchOutcome, WatchList, WatchQuery};
pub use config::Config;
pub use fetch::{FetchEngine, FetchResult, FetchState};
pub use history::WatchHistory;
