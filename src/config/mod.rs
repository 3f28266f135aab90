//! Configuration module for watchlist
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use watchlist::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("watchlist.toml")).unwrap();
//! println!("Fetch workers: {}", config.engine.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BatchConfig, Config, EngineConfig, FailurePolicy, PathsConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
