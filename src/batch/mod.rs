//! Batch processing
//!
//! A batch runs every query of one watch list: all fetches are submitted up front,
//! their results are consumed in submission order, extracted items are diffed
//! against the watch history, and the history is persisted once at the end.
//!
//! # Components
//!
//! - `WatchQuery`: one request of a watch list and the extractor for its payload
//! - `DiffEngine`: decides which extracted items are new
//! - `BatchCoordinator`: sequences fetch, extract and diff for a list of queries
//! - `BatchOutcome`: new items per query, consumed by the report

mod coordinator;
mod diff;
mod outcome;

pub use coordinator::BatchCoordinator;
pub use diff::{DiffEngine, MAX_FIRST_RUN_ITEMS};
pub use outcome::{BatchOutcome, QueryFailure, QueryReport};

use crate::config::Config;
use crate::fetch::{Endpoint, FetchEngine, HttpVersion, Scheme};
use crate::history::WatchHistory;
use std::fmt;
use std::path::PathBuf;

/// A link shown next to an item or a query in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLink {
    pub label: String,
    pub url: String,
}

impl ItemLink {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// One listing extracted from a page
///
/// The identifier is the dedup key: equal identifiers denote the same listing
/// across runs. Everything else is display data for the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub price: String,
    pub image_url: Option<String>,
    pub links: Vec<ItemLink>,
    pub notes: Vec<String>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = price.into();
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_link(mut self, link: ItemLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// One request of a watch list together with the extractor for its response
pub trait WatchQuery {
    /// Human readable name used in logs and as the report section title
    fn label(&self) -> String;

    /// Request target (path and query) on the watch list's endpoint
    fn target(&self) -> String;

    /// Turns a response payload into items; malformed payloads yield no items
    fn extract(&self, payload: &[u8]) -> Vec<Item>;

    /// Links describing the query itself
    fn links(&self) -> Vec<ItemLink> {
        Vec::new()
    }
}

/// The queries of one input list, all served by the same origin
pub struct WatchList {
    /// Name of the list; used in logs and the report title
    pub name: String,

    pub scheme: Scheme,
    pub host: String,
    pub port: u16,

    /// File the list's watch history is persisted to
    pub history_path: PathBuf,

    pub queries: Vec<Box<dyn WatchQuery>>,
}

impl WatchList {
    /// Creates an empty list for the given origin, using the scheme's default port
    pub fn new(
        name: impl Into<String>,
        scheme: Scheme,
        host: impl Into<String>,
        history_path: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            scheme,
            host: host.into(),
            port: scheme.default_port(),
            history_path,
            queries: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn push(&mut self, query: impl WatchQuery + 'static) {
        self.queries.push(Box::new(query));
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl fmt::Debug for WatchList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchList")
            .field("name", &self.name)
            .field("origin", &format!("{}://{}:{}", self.scheme, self.host, self.port))
            .field("history_path", &self.history_path)
            .field("queries", &self.queries.len())
            .finish()
    }
}

/// Runs one batch over a watch list
///
/// Loads the list's history, resolves the endpoint, fetches and diffs every query,
/// then saves the history.
///
/// # Arguments
///
/// * `config` - Engine and batch settings
/// * `list` - Queries to run and where their history lives
///
/// # Returns
///
/// * `Ok(BatchOutcome)` - New items per query
/// * `Err(WatchError)` - History could not be loaded or saved, or a fetch failed
///   under the fail-fast policy (history is not saved in that case)
pub fn run_watch_list(config: &Config, list: &WatchList) -> crate::Result<BatchOutcome> {
    let mut history = WatchHistory::load(&list.history_path)?;
    let first_run = history.is_empty();

    tracing::info!(
        list = %list.name,
        queries = list.len(),
        known = history.len(),
        first_run,
        "Starting batch"
    );

    if list.is_empty() {
        return Ok(BatchOutcome::default());
    }

    let version = HttpVersion::parse(&config.engine.http_version).unwrap_or_default();
    let endpoint = Endpoint::resolve(&list.host, list.port, list.scheme, version)?;
    let engine = FetchEngine::from_config(endpoint, &config.engine)?;

    let coordinator = BatchCoordinator::new(
        &engine,
        config.batch.failure_policy,
        DiffEngine::new(config.batch.first_run_cap),
    );
    let outcome = coordinator.run(&list.queries, &mut history, first_run)?;
    engine.shutdown();

    history.save(&list.history_path)?;

    tracing::info!(
        list = %list.name,
        new_items = outcome.new_item_count(),
        queries_with_news = outcome.reports().len(),
        failed = outcome.failures().len(),
        known = history.len(),
        "Batch finished"
    );

    Ok(outcome)
}
