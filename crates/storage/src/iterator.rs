//! Single-pass result sequences for range, rich and history queries.
//!
//! Ledger queries are served from server-side cursors that hold resources
//! until they are released. [`ResultsIterator`] models such a cursor: it
//! yields each item once, in the order the ledger produced them, and releases
//! the underlying resource exactly once: when the caller calls
//! [`close`](ResultsIterator::close), when the cursor is exhausted, or when
//! the iterator is dropped after an early return.
//!
//! # Example
//!
//! ```
//! use electronics_ledger_storage::{ResultsIterator, StorageResult};
//!
//! let mut results = ResultsIterator::from_vec(vec![1, 2, 3]);
//! let first: StorageResult<i32> = results.next().unwrap();
//! assert_eq!(first.unwrap(), 1);
//! results.close();
//! ```

use std::collections::VecDeque;

use crate::error::StorageResult;

/// Backend side of a [`ResultsIterator`].
///
/// Adapters implement this for whatever handle their query API returns.
pub trait QueryCursor<T>: Send {
    /// Produces the next item, `None` once the cursor is exhausted.
    fn next_item(&mut self) -> Option<StorageResult<T>>;

    /// Releases the resources backing the cursor.
    ///
    /// Called at most once by [`ResultsIterator`].
    fn close(&mut self);
}

/// A finite, single-pass sequence of query results.
///
/// Items are `StorageResult<T>` because a remote cursor may fail between
/// pages. The iterator is fused: after the first `None` it stays exhausted
/// and its cursor has been closed.
pub struct ResultsIterator<T> {
    cursor: Option<Box<dyn QueryCursor<T>>>,
}

impl<T: Send + 'static> ResultsIterator<T> {
    /// Wraps a backend cursor.
    pub fn new(cursor: impl QueryCursor<T> + 'static) -> Self {
        Self { cursor: Some(Box::new(cursor)) }
    }

    /// Builds an iterator over an already materialized result set.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::new(VecCursor::new(items))
    }
}

impl<T> ResultsIterator<T> {
    /// Releases the underlying cursor. Idempotent.
    pub fn close(mut self) {
        self.release();
    }

    /// Returns `true` once the cursor has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    fn release(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }
}

impl<T> Iterator for ResultsIterator<T> {
    type Item = StorageResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.cursor.as_mut()?.next_item();
        if item.is_none() {
            self.release();
        }
        item
    }
}

impl<T> Drop for ResultsIterator<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> std::fmt::Debug for ResultsIterator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultsIterator").field("closed", &self.is_closed()).finish()
    }
}

/// Callback run when a [`VecCursor`] is closed.
pub type CloseHook = Box<dyn FnOnce() + Send>;

/// Cursor over a snapshot taken when the query was issued.
pub struct VecCursor<T> {
    items: VecDeque<T>,
    on_close: Option<CloseHook>,
}

impl<T> VecCursor<T> {
    /// Creates a cursor over `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self { items: items.into(), on_close: None }
    }

    /// Registers a hook that runs when the cursor is released.
    #[must_use]
    pub fn on_close(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }
}

impl<T: Send> QueryCursor<T> for VecCursor<T> {
    fn next_item(&mut self) -> Option<StorageResult<T>> {
        self.items.pop_front().map(Ok)
    }

    fn close(&mut self) {
        self.items.clear();
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}
