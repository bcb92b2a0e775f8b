//! Sparse updates: a set of changed columns for one row.

use std::sync::Arc;

use crate::error::Result;
use crate::mapping::{Model, ObjectInfo, object_info_of};
use crate::value::Value;

/// A partial update: the identifier of one row plus the column/value pairs
/// that changed, without a full instance.
///
/// A delta with zero changes cannot be turned into an UPDATE; that contract
/// is checked by the session before the dialect is involved.
#[derive(Debug, Clone)]
pub struct ObjectDelta {
    object_info: Arc<ObjectInfo>,
    identifier: Value,
    changes: Vec<(String, Value)>,
}

impl ObjectDelta {
    /// Create a delta for the row of `M` with the given identifier.
    pub fn new<M: Model>(identifier: impl Into<Value>) -> Result<Self> {
        Ok(Self {
            object_info: object_info_of::<M>()?,
            identifier: identifier.into(),
            changes: Vec::new(),
        })
    }

    /// Record a changed column.
    pub fn add_change(&mut self, column_name: impl Into<String>, new_value: impl Into<Value>) {
        self.changes.push((column_name.into(), new_value.into()));
    }

    /// The resolved mapping for the delta's type.
    #[must_use]
    pub fn object_info(&self) -> &ObjectInfo {
        &self.object_info
    }

    /// The identifier of the row being updated.
    #[must_use]
    pub const fn identifier(&self) -> &Value {
        &self.identifier
    }

    /// The changed column/value pairs, in the order they were added.
    #[must_use]
    pub fn changes(&self) -> &[(String, Value)] {
        &self.changes
    }

    /// The number of changed columns.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}
