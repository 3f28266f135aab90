//! Supported sites
//!
//! Each site knows its origin, how to read its input list and how to build request
//! targets for its queries.

pub mod diskunion;
pub mod yahoo;

pub use diskunion::DiskunionItemQuery;
pub use yahoo::{SearchMethod, YahooSearchQuery};

use crate::batch::WatchList;
use crate::fetch::Scheme;
use crate::history::history_path;
use crate::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};

/// A site with its own input list and watch history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    /// Yahoo! Auctions keyword searches
    Yahoo,

    /// Diskunion used copies of watched products
    Diskunion,
}

impl Site {
    /// Short name used for the watch-history file
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Diskunion => "diskunion",
        }
    }

    /// Report heading
    pub fn title(&self) -> &'static str {
        match self {
            Self::Yahoo => "Yahoo! Auctions",
            Self::Diskunion => "Diskunion",
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            Self::Yahoo => yahoo::HOST,
            Self::Diskunion => diskunion::HOST,
        }
    }

    /// Input list used when the command line names none
    pub fn default_input_file(&self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo_keywords.txt",
            Self::Diskunion => "diskunion_items.txt",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves an input list path given on the command line
///
/// A bare file name is looked up in `data_dir`; without a file the site's default
/// list in `data_dir` is used.
pub fn input_path(site: Site, file: Option<&Path>, data_dir: &Path) -> PathBuf {
    match file {
        Some(file) if has_parent(file) => file.to_path_buf(),
        Some(file) => data_dir.join(file),
        None => data_dir.join(site.default_input_file()),
    }
}

/// Directory holding the watch history of an input list
///
/// Histories live next to their input list, or in `data_dir` for a bare file name.
pub fn history_dir(input: &Path, data_dir: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if has_parent(input) => parent.to_path_buf(),
        _ => data_dir.to_path_buf(),
    }
}

fn has_parent(path: &Path) -> bool {
    path.parent().is_some_and(|parent| !parent.as_os_str().is_empty())
}

/// Reads a site's input list and builds its watch list
///
/// # Arguments
///
/// * `site` - Which parser and origin to use
/// * `input` - Path of the keywords or items file
/// * `data_dir` - Fallback directory for the watch history
///
/// # Returns
///
/// * `Ok(WatchList)` - Queries in file order
/// * `Err(ConfigError::InputFile)` - The input list cannot be read
pub fn load_watch_list(site: Site, input: &Path, data_dir: &Path) -> Result<WatchList, ConfigError> {
    let content = std::fs::read_to_string(input).map_err(|source| ConfigError::InputFile {
        path: input.display().to_string(),
        source,
    })?;

    let history = history_path(&history_dir(input, data_dir), site.name());
    let mut list = WatchList::new(site.name(), Scheme::Https, site.host(), history);

    match site {
        Site::Yahoo => yahoo::parse_keywords(&content)
            .into_iter()
            .for_each(|query| list.push(query)),
        Site::Diskunion => diskunion::parse_items(&content)
            .into_iter()
            .for_each(|query| list.push(query)),
    }

    tracing::debug!(
        site = %site,
        input = %input.display(),
        queries = list.len(),
        "Loaded watch list"
    );
    Ok(list)
}
