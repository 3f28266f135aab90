//! Output module for generating watch reports
//!
//! This module handles:
//! - Rendering the new items of a batch as markdown
//! - Writing timestamped report files named after the input list

mod markdown;

pub use markdown::{render_report, report_file_name, write_report};

use thiserror::Error;

/// Errors raised while writing a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for report operations
pub type ReportResult<T> = std::result::Result<T, ReportError>;
