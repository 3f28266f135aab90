//! Diff engine: which extracted items are new

use crate::batch::Item;
use crate::history::WatchHistory;

/// Items reported per query on a first run
pub const MAX_FIRST_RUN_ITEMS: usize = 10;

/// Decides, per item, whether it is new and records it in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffEngine {
    first_run_cap: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(MAX_FIRST_RUN_ITEMS)
    }
}

impl DiffEngine {
    pub fn new(first_run_cap: usize) -> Self {
        Self { first_run_cap }
    }

    pub fn first_run_cap(&self) -> usize {
        self.first_run_cap
    }

    /// Returns the new items of one query, in extraction order
    ///
    /// On a first run there is nothing to diff against: at most `first_run_cap`
    /// items are reported, but every identifier is recorded so the next run only
    /// reports genuinely new listings. On later runs an item is new exactly when its
    /// identifier is not yet in `history`.
    ///
    /// # Arguments
    ///
    /// * `items` - Items extracted from one response
    /// * `history` - Watch history, updated in place
    /// * `first_run` - Whether the history was empty when the batch started
    pub fn diff(&self, items: Vec<Item>, history: &mut WatchHistory, first_run: bool) -> Vec<Item> {
        let mut new_items = Vec::new();

        for item in items {
            if first_run {
                history.insert(item.id.as_str());
                if new_items.len() < self.first_run_cap {
                    new_items.push(item);
                }
            } else if history.insert(item.id.as_str()) {
                new_items.push(item);
            }
        }

        new_items
    }
}
