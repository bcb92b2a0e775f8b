//! Deferred read handles.
//!
//! Registering an include does not touch the database: the session queues the
//! query and hands back a handle whose value materialises when
//! `execute_pending_queries` runs. The handle is a write-once cell that fails
//! loudly — [`Error::IncludeNotExecuted`] — when read before the flush, so a
//! forgotten flush is an error rather than a silent default.

use std::sync::{Arc, OnceLock};

use minorm_core::{Error, Result, Value};

/// A deferred single-row read.
#[derive(Debug)]
pub struct Include<M> {
    cell: Arc<OnceLock<Option<M>>>,
}

impl<M> Include<M> {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn cell(&self) -> Arc<OnceLock<Option<M>>> {
        Arc::clone(&self.cell)
    }

    /// Whether the pending queries have run and this handle is readable.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The fetched row, or `None` when the query matched nothing.
    pub fn value(&self) -> Result<Option<&M>> {
        self.cell
            .get()
            .map(Option::as_ref)
            .ok_or(Error::IncludeNotExecuted)
    }
}

impl<M> Clone for Include<M> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

/// A deferred multi-row read.
#[derive(Debug)]
pub struct IncludeMany<M> {
    cell: Arc<OnceLock<Vec<M>>>,
}

impl<M> IncludeMany<M> {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn cell(&self) -> Arc<OnceLock<Vec<M>>> {
        Arc::clone(&self.cell)
    }

    /// Whether the pending queries have run and this handle is readable.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The fetched rows, in query order.
    pub fn values(&self) -> Result<&[M]> {
        self.cell
            .get()
            .map(Vec::as_slice)
            .ok_or(Error::IncludeNotExecuted)
    }
}

impl<M> Clone for IncludeMany<M> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

/// A deferred scalar read: the first column of a single-row result.
#[derive(Debug, Clone)]
pub struct IncludeScalar {
    cell: Arc<OnceLock<Option<Value>>>,
}

impl IncludeScalar {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn cell(&self) -> Arc<OnceLock<Option<Value>>> {
        Arc::clone(&self.cell)
    }

    /// Whether the pending queries have run and this handle is readable.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The scalar value, or `None` when the query matched nothing.
    pub fn value(&self) -> Result<Option<&Value>> {
        self.cell
            .get()
            .map(Option::as_ref)
            .ok_or(Error::IncludeNotExecuted)
    }
}
