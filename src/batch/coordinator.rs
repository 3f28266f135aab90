//! Batch coordinator
//!
//! Submits every query's fetch before the worker pool starts, then consumes the
//! results strictly in submission order, regardless of which exchange finishes
//! first.

use crate::batch::{BatchOutcome, DiffEngine, WatchQuery};
use crate::config::FailurePolicy;
use crate::fetch::{FetchEngine, FetchError, FetchResult};
use crate::history::WatchHistory;

/// Sequences fetch, extraction and diff for the queries of one batch
pub struct BatchCoordinator<'a> {
    engine: &'a FetchEngine,
    policy: FailurePolicy,
    diff: DiffEngine,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(engine: &'a FetchEngine, policy: FailurePolicy, diff: DiffEngine) -> Self {
        Self {
            engine,
            policy,
            diff,
        }
    }

    /// Runs every query and diffs its items into `history`
    ///
    /// # Arguments
    ///
    /// * `queries` - Queries in the order their results are attributed
    /// * `history` - Watch history, updated in place
    /// * `first_run` - Whether the history was empty when the batch started
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOutcome)` - New items per query; under best-effort also the failures
    /// * `Err(FetchError)` - First failed fetch under fail-fast, or the pool did not start
    pub fn run(
        &self,
        queries: &[Box<dyn WatchQuery>],
        history: &mut WatchHistory,
        first_run: bool,
    ) -> Result<BatchOutcome, FetchError> {
        let pending: Vec<(&dyn WatchQuery, FetchResult)> = queries
            .iter()
            .map(|query| {
                let query = query.as_ref();
                (query, self.engine.async_fetch(&query.target()))
            })
            .collect();

        self.engine.start()?;

        let mut outcome = BatchOutcome::new();
        for (query, result) in pending {
            let label = query.label();

            let response = match result.wait() {
                Ok(response) => response,
                Err(e) => match self.policy {
                    FailurePolicy::FailFast => {
                        tracing::error!(query = %label, error = %e, "Fetch failed, aborting batch");
                        return Err(e);
                    }
                    FailurePolicy::BestEffort => {
                        tracing::warn!(query = %label, error = %e, "Fetch failed, skipping query");
                        outcome.record_failure(label, e);
                        continue;
                    }
                },
            };

            if !response.is_success() {
                tracing::warn!(
                    query = %label,
                    target = %result.target(),
                    status = response.status,
                    "Unexpected HTTP status"
                );
            }

            let items = query.extract(&response.body);
            let extracted = items.len();
            let new_items = self.diff.diff(items, history, first_run);

            tracing::info!(
                query = %label,
                items = extracted,
                new_items = new_items.len(),
                "Query processed"
            );
            outcome.record(label, query.links(), new_items);
        }

        Ok(outcome)
    }
}
