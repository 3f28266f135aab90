//! Batch outcome: new items per query, consumed by the report

use crate::batch::{Item, ItemLink};
use crate::fetch::FetchError;

/// New items of one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReport {
    pub label: String,
    pub links: Vec<ItemLink>,
    pub items: Vec<Item>,
}

/// A query skipped under the best-effort policy
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub label: String,
    pub error: FetchError,
}

/// Result of one batch: new items per query in submission order
///
/// Queries without new items are omitted.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    reports: Vec<QueryReport>,
    failures: Vec<QueryFailure>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the new items of a query; nothing is recorded for an empty list
    pub fn record(&mut self, label: String, links: Vec<ItemLink>, items: Vec<Item>) {
        if items.is_empty() {
            return;
        }
        self.reports.push(QueryReport {
            label,
            links,
            items,
        });
    }

    pub fn record_failure(&mut self, label: String, error: FetchError) {
        self.failures.push(QueryFailure { label, error });
    }

    pub fn reports(&self) -> &[QueryReport] {
        &self.reports
    }

    pub fn failures(&self) -> &[QueryFailure] {
        &self.failures
    }

    /// New items reported for the query with this label
    pub fn get(&self, label: &str) -> Option<&[Item]> {
        self.reports
            .iter()
            .find(|report| report.label == label)
            .map(|report| report.items.as_slice())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.reports.iter().map(|r| r.label.as_str()).collect()
    }

    pub fn new_item_count(&self) -> usize {
        self.reports.iter().map(|r| r.items.len()).sum()
    }

    /// True when no query produced new items
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
